//! Plugin to host callbacks.
//!
//! Plugins never touch the session directly; they queue [`PluginAction`]s
//! which the client applies in order.

use slirc_proto::Command;
use tokio::sync::mpsc;

use crate::error::HandlerResult;

/// Something a plugin asks the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginAction {
    /// Send a line untouched.
    SendRaw(String),
    Privmsg { target: String, text: String },
    Notice { target: String, text: String },
    /// Add a channel to the roster (sends JOIN).
    Join(String),
    /// Remove a channel from the roster (sends PART).
    Part(String),
    Quit(Option<String>),
}

impl PluginAction {
    /// The outbound command for actions that bypass the roster.
    ///
    /// `Join` and `Part` return `None`: they go through the session so the
    /// roster stays in sync.
    pub fn to_command(&self) -> Option<Command> {
        match self {
            Self::SendRaw(line) => Some(Command::Raw(line.clone())),
            Self::Privmsg { target, text } => Some(Command::privmsg(target, text)),
            Self::Notice { target, text } => Some(Command::notice(target, text)),
            Self::Quit(reason) => Some(Command::QUIT(reason.clone())),
            Self::Join(_) | Self::Part(_) => None,
        }
    }
}

/// Cloneable handle plugins use to queue actions for the host.
#[derive(Debug, Clone)]
pub struct PluginCallback {
    tx: mpsc::Sender<PluginAction>,
}

impl PluginCallback {
    /// Create a callback and the receiving end the host drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PluginAction>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn send(&self, action: PluginAction) -> HandlerResult {
        self.tx.send(action).await?;
        Ok(())
    }

    pub async fn send_raw(&self, line: impl Into<String>) -> HandlerResult {
        self.send(PluginAction::SendRaw(line.into())).await
    }

    pub async fn privmsg(&self, target: impl Into<String>, text: impl Into<String>) -> HandlerResult {
        self.send(PluginAction::Privmsg {
            target: target.into(),
            text: text.into(),
        })
        .await
    }

    pub async fn notice(&self, target: impl Into<String>, text: impl Into<String>) -> HandlerResult {
        self.send(PluginAction::Notice {
            target: target.into(),
            text: text.into(),
        })
        .await
    }

    pub async fn join(&self, channel: impl Into<String>) -> HandlerResult {
        self.send(PluginAction::Join(channel.into())).await
    }

    pub async fn part(&self, channel: impl Into<String>) -> HandlerResult {
        self.send(PluginAction::Part(channel.into())).await
    }

    pub async fn quit(&self, reason: Option<String>) -> HandlerResult {
        self.send(PluginAction::Quit(reason)).await
    }

    /// Whether the host stopped accepting actions.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;

    #[tokio::test]
    async fn actions_arrive_in_order() {
        let (callback, mut rx) = PluginCallback::channel(8);
        callback.join("#rust").await.unwrap();
        callback.privmsg("#rust", "hello").await.unwrap();

        assert_eq!(rx.recv().await, Some(PluginAction::Join("#rust".into())));
        assert_eq!(
            rx.recv().await,
            Some(PluginAction::Privmsg {
                target: "#rust".into(),
                text: "hello".into()
            })
        );
    }

    #[tokio::test]
    async fn closed_host_is_reported() {
        let (callback, rx) = PluginCallback::channel(1);
        drop(rx);

        assert!(callback.is_closed());
        let err = callback.send_raw("PING x").await.unwrap_err();
        assert!(matches!(err, HandlerError::Callback(_)));
    }

    #[test]
    fn roster_actions_have_no_command() {
        assert!(PluginAction::Join("#a".into()).to_command().is_none());
        assert_eq!(
            PluginAction::Notice {
                target: "bob".into(),
                text: "hi".into()
            }
            .to_command()
            .map(|c| c.to_string()),
            Some("NOTICE bob :hi".to_string())
        );
    }
}
