//! Client orchestration.
//!
//! A [`Client`] wires the session, the plugin host and the history
//! provider together: it reads messages off the session, records them,
//! dispatches them to plugins and applies the actions plugins queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use slirc_proto::format::strip_formatting;
use slirc_proto::{Formatter, Message};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ClientError;
use crate::history::{self, HistoryProvider};
use crate::network::Connection;
use crate::plugin::{PluginAction, PluginCallback, PluginDiscovery, PluginHost};
use crate::state::Session;
use crate::telemetry::spans;

/// Capacity of the plugin action queue.
const ACTION_QUEUE: usize = 256;

pub struct Client {
    id: Uuid,
    config: Arc<Config>,
    session: Arc<Session>,
    host: PluginHost,
    history: Arc<dyn HistoryProvider>,
    discovery: Box<dyn PluginDiscovery>,
    plugins_loaded: AtomicBool,
    /// Shared so a fresh applier can take over after `dispose`.
    actions: Arc<AsyncMutex<mpsc::Receiver<PluginAction>>>,
    applier: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Build a client from configuration. Nothing touches the network yet.
    pub fn new(
        config: Arc<Config>,
        discovery: impl PluginDiscovery + 'static,
    ) -> Result<Self, ClientError> {
        let connection = Connection::new(
            config.server.address.clone(),
            config.server.port,
            config.server.max_retries,
        )?
        .with_retry_delay(Duration::from_millis(config.server.retry_delay_ms));

        let session = Session::new(connection)
            .with_password(config.server.password.clone())
            .with_formatter(display_formatter());

        let (callback, actions) = PluginCallback::channel(ACTION_QUEUE);

        Ok(Self {
            id: Uuid::new_v4(),
            history: history::from_config(&config.history),
            config,
            session: Arc::new(session),
            host: PluginHost::new(callback),
            discovery: Box::new(discovery),
            plugins_loaded: AtomicBool::new(false),
            actions: Arc::new(AsyncMutex::new(actions)),
            applier: Mutex::new(None),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn host(&self) -> &PluginHost {
        &self.host
    }

    /// Stored message history.
    pub fn history(&self) -> &Arc<dyn HistoryProvider> {
        &self.history
    }

    /// Load plugins, connect, register and start plugins.
    ///
    /// May be called again after `dispose` or a lost connection; plugins
    /// are only loaded the first time.
    pub async fn initialise(&self) -> Result<(), ClientError> {
        if !self.plugins_loaded.load(Ordering::Acquire) {
            let loaded = self.host.load_from(self.discovery.as_ref())?;
            self.plugins_loaded.store(true, Ordering::Release);
            info!(client = %self.id, plugins = loaded, "Plugins loaded");
        }

        self.session.initialise().await?;
        self.session
            .send_identity(&self.config.identity.nickname, self.config.identity.realname())
            .await?;

        self.spawn_applier();

        if self.config.plugins.autostart {
            let running = self.host.start_all(&self.config.plugin_config()).await;
            info!(client = %self.id, running, "Plugins started");
        }
        Ok(())
    }

    fn spawn_applier(&self) {
        let mut applier = self.applier.lock();
        if applier.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let session = Arc::clone(&self.session);
        let actions = Arc::clone(&self.actions);
        *applier = Some(tokio::spawn(apply_actions(session, actions)));
    }

    /// Process inbound messages until `shutdown` fires or the connection is
    /// gone for good.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ClientError> {
        let connection = self.session.connection();
        let span = spans::session(&self.id.to_string(), connection.address(), connection.port());

        async {
            loop {
                let message = tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Shutdown requested");
                        break;
                    }
                    message = self.session.listen_cycle() => message,
                };

                match message {
                    Some(message) => self.handle(message).await,
                    None if !self.session.is_connected() => {
                        warn!("Connection lost");
                        break;
                    }
                    None => {}
                }
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn handle(&self, message: Message) {
        let message = Arc::new(message);
        if let Err(e) = self.history.store(Arc::clone(&message)).await {
            warn!(error = %e, "Failed to store message");
        }

        if self.config.is_ignored(&message.nickname) {
            debug!(nickname = %message.nickname, "Ignoring message from ignored sender");
            return;
        }

        let report = self.host.dispatch(message).await;
        if report.failed > 0 {
            debug!(invoked = report.invoked, failed = report.failed, "Dispatch finished with failures");
        }
    }

    /// Send a raw line.
    pub async fn send(&self, line: &str) -> Result<(), ClientError> {
        self.session.send_raw(line).await?;
        Ok(())
    }

    pub fn command_exists(&self, command: &str) -> bool {
        self.host.registry().command_exists(command)
    }

    /// Description registered for a composition id.
    pub fn command_description(&self, id: &str) -> Option<String> {
        self.host.registry().description(id)
    }

    /// Stop plugins and release the connection.
    pub async fn dispose(&self) {
        self.host.stop_all().await;
        if let Some(applier) = self.applier.lock().take() {
            applier.abort();
        }
        self.session.dispose().await;
        info!(client = %self.id, "Client disposed");
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(applier) = self.applier.get_mut().take() {
            applier.abort();
        }
    }
}

/// Drain plugin actions into the session, in order.
async fn apply_actions(session: Arc<Session>, actions: Arc<AsyncMutex<mpsc::Receiver<PluginAction>>>) {
    let mut actions = actions.lock().await;
    while let Some(action) = actions.recv().await {
        apply(&session, action).await;
    }
    debug!("Plugin action queue closed");
}

async fn apply(session: &Session, action: PluginAction) {
    let result = match &action {
        PluginAction::Join(channel) => session.add_channel(channel).await.map(|added| {
            if !added {
                debug!(channel = %channel, "Already in channel");
            }
        }),
        PluginAction::Part(channel) => session.remove_channel(channel).await.map(|removed| {
            if !removed {
                debug!(channel = %channel, "Not in channel");
            }
        }),
        other => match other.to_command() {
            Some(command) => session.send_command(command).await,
            None => Ok(()),
        },
    };

    if let Err(e) = result {
        warn!(action = ?action, error = %e, "Plugin action failed");
    }
}

/// Formatter used for logs and bridges: `[#chan] <nick> text` for chat,
/// the raw line for everything else.
pub fn display_formatter() -> Formatter {
    Arc::new(|message: &Message| match message.command() {
        Some("PRIVMSG") | Some("NOTICE") => format!(
            "[{}] <{}> {}",
            message.origin,
            message.nickname,
            strip_formatting(&message.args)
        ),
        _ => message.raw.clone(),
    })
}
