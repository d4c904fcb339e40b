//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use slirc_proto::ChannelExt;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.address is required")]
    MissingAddress,
    #[error("server.port must not be 0")]
    InvalidPort,
    #[error("server.max_retries must be at least 1")]
    InvalidRetryCount,
    #[error("identity.nickname is required")]
    MissingNickname,
    #[error("identity.nickname must not contain whitespace, got '{0}'")]
    InvalidNickname(String),
    #[error("channels contains an invalid channel name: '{0}'")]
    InvalidChannel(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.address.trim().is_empty() {
        errors.push(ValidationError::MissingAddress);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if config.server.max_retries == 0 {
        errors.push(ValidationError::InvalidRetryCount);
    }

    let nickname = &config.identity.nickname;
    if nickname.is_empty() {
        errors.push(ValidationError::MissingNickname);
    } else if nickname.chars().any(char::is_whitespace) {
        errors.push(ValidationError::InvalidNickname(nickname.clone()));
    }

    errors.extend(
        config
            .channels
            .iter()
            .filter(|channel| !channel.is_channel_name())
            .map(|channel| ValidationError::InvalidChannel(channel.clone())),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
