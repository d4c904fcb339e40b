//! Built-in plugin: autojoin, `!commands` and CTCP VERSION.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use slirc_proto::Message;
use tracing::info;

use super::callback::PluginCallback;
use super::composition::Composition;
use super::host::Plugin;
use crate::config::PluginConfig;
use crate::error::{HandlerResult, PluginError};

const CTCP_VERSION: &str = "\x01VERSION\x01";

pub const COMMANDS_ID: &str = "core.commands";
pub const COMMANDS_DESCRIPTION: &str = "!commands - list available commands";

/// Plugin every client runs.
pub struct CorePlugin {
    descriptions: Arc<Vec<(String, String)>>,
    channels: Arc<RwLock<Vec<String>>>,
}

impl CorePlugin {
    /// `descriptions` are the `(id, description)` pairs `!commands` lists,
    /// after the plugin's own.
    pub fn new(descriptions: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut all = vec![(COMMANDS_ID.to_string(), COMMANDS_DESCRIPTION.to_string())];
        all.extend(descriptions);
        Self {
            descriptions: Arc::new(all),
            channels: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn welcome(&self) -> Composition {
        let channels = Arc::clone(&self.channels);
        Composition::from_fn("core.autojoin", ["001"], move |_, callback| {
            let channels = channels.read().clone();
            async move { join_all(&callback, channels).await }
        })
    }

    fn commands(&self) -> Composition {
        let descriptions = Arc::clone(&self.descriptions);
        Composition::from_fn(COMMANDS_ID, ["PRIVMSG"], move |message, callback| {
            let descriptions = Arc::clone(&descriptions);
            async move { list_commands(&message, &callback, &descriptions).await }
        })
        .with_description(COMMANDS_DESCRIPTION)
    }

    fn version(&self) -> Composition {
        Composition::from_fn("core.version", ["PRIVMSG"], |message, callback| async move {
            if message.args != CTCP_VERSION {
                return Ok(());
            }
            callback
                .notice(
                    message.nickname.clone(),
                    format!("\x01VERSION {} {}\x01", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
                )
                .await
        })
    }
}

async fn join_all(callback: &PluginCallback, channels: Vec<String>) -> HandlerResult {
    for channel in channels {
        callback.join(channel).await?;
    }
    Ok(())
}

async fn list_commands(
    message: &Message,
    callback: &PluginCallback,
    descriptions: &[(String, String)],
) -> HandlerResult {
    if message.args.trim() != "!commands" {
        return Ok(());
    }
    let target = message.response_target();
    for (_, description) in descriptions {
        callback.privmsg(target, description.clone()).await?;
    }
    Ok(())
}

#[async_trait]
impl Plugin for CorePlugin {
    fn name(&self) -> &str {
        "core"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn compositions(&self) -> Vec<Composition> {
        vec![self.welcome(), self.commands(), self.version()]
    }

    async fn start(&self, config: &PluginConfig, _callback: PluginCallback) -> Result<(), PluginError> {
        *self.channels.write() = config.channels.clone();
        info!(channels = config.channels.len(), "Autojoin channels set");
        Ok(())
    }

    async fn stop(&self) -> Result<(), PluginError> {
        self.channels.write().clear();
        Ok(())
    }
}
