//! Compositions: command-triggered handlers contributed by plugins.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use slirc_proto::Message;

use super::callback::PluginCallback;
use crate::error::{HandlerResult, PluginError};

/// Handler invoked for every message whose command is in a composition's
/// trigger set.
#[async_trait]
pub trait CompositionHandler: Send + Sync {
    async fn handle(&self, message: Arc<Message>, callback: PluginCallback) -> HandlerResult;
}

/// Adapter so plain async closures can be used as handlers.
struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CompositionHandler for FnHandler<F>
where
    F: Fn(Arc<Message>, PluginCallback) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, message: Arc<Message>, callback: PluginCallback) -> HandlerResult {
        (self.0)(message, callback).await
    }
}

/// A named handler bound to one or more command tokens.
#[derive(Clone)]
pub struct Composition {
    id: String,
    commands: Vec<String>,
    description: Option<String>,
    handler: Arc<dyn CompositionHandler>,
}

impl Composition {
    /// Create a composition. Command tokens are matched case-insensitively.
    pub fn new<I, S>(id: impl Into<String>, commands: I, handler: impl CompositionHandler + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            id: id.into(),
            commands: commands
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_uppercase())
                .collect(),
            description: None,
            handler: Arc::new(handler),
        }
    }

    /// Create a composition from an async closure.
    pub fn from_fn<I, S, F, Fut>(id: impl Into<String>, commands: I, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(Arc<Message>, PluginCallback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(id, commands, FnHandler(f))
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Trigger command tokens, upper-cased.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(crate) fn handler(&self) -> &Arc<dyn CompositionHandler> {
        &self.handler
    }

    /// Check the composition can be registered.
    pub fn validate(&self) -> Result<(), PluginError> {
        let reason = if self.id.is_empty() {
            "empty id"
        } else if self.commands.is_empty() {
            "no trigger commands"
        } else if self.commands.iter().any(|c| c.is_empty()) {
            "empty command token"
        } else {
            return Ok(());
        };

        Err(PluginError::InvalidComposition {
            id: self.id.clone(),
            reason: reason.to_string(),
        })
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("id", &self.id)
            .field("commands", &self.commands)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
