//! Plugin lifecycle management.
//!
//! The host loads plugins, registers their compositions and starts / stops
//! them. Each lifecycle call runs inside its own failure boundary, so one
//! broken plugin never keeps the others from starting or stopping.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::FutureExt;
use parking_lot::RwLock;
use slirc_proto::Message;
use tracing::{Instrument, error, info, warn};

use super::callback::PluginCallback;
use super::composition::Composition;
use super::discovery::PluginDiscovery;
use super::registry::{DispatchReport, Registry};
use crate::config::PluginConfig;
use crate::error::PluginError;
use crate::telemetry::spans;

/// A unit of functionality that contributes compositions.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Compositions registered when the plugin is loaded.
    fn compositions(&self) -> Vec<Composition>;

    /// Called once the session is registered.
    async fn start(&self, config: &PluginConfig, callback: PluginCallback) -> Result<(), PluginError>;

    /// Called on shutdown.
    async fn stop(&self) -> Result<(), PluginError>;
}

/// Whether a plugin's `start` has succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    Stopped,
    Running,
}

/// A loaded plugin and its status.
#[derive(Clone)]
pub struct PluginInstance {
    plugin: Arc<dyn Plugin>,
    status: PluginStatus,
}

impl PluginInstance {
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    pub fn version(&self) -> &str {
        self.plugin.version()
    }

    pub fn status(&self) -> PluginStatus {
        self.status
    }
}

/// Owns the registry and the loaded plugins.
pub struct PluginHost {
    registry: Arc<Registry>,
    plugins: RwLock<Vec<PluginInstance>>,
    callback: PluginCallback,
    shutting_down: AtomicBool,
}

impl PluginHost {
    pub fn new(callback: PluginCallback) -> Self {
        Self {
            registry: Arc::new(Registry::new(callback.clone())),
            plugins: RwLock::new(Vec::new()),
            callback,
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Whether `stop_all` has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Snapshot of the loaded plugins.
    pub fn plugins(&self) -> Vec<PluginInstance> {
        self.plugins.read().clone()
    }

    /// Load one plugin and register its compositions.
    ///
    /// Returns how many compositions were accepted.
    pub fn load(&self, plugin: Arc<dyn Plugin>) -> usize {
        let compositions = plugin.compositions();
        let offered = compositions.len();
        let accepted = self.registry.register_all(compositions);

        info!(
            plugin = %plugin.name(),
            version = %plugin.version(),
            compositions = accepted,
            rejected = offered - accepted,
            "Plugin loaded"
        );
        self.plugins.write().push(PluginInstance {
            plugin,
            status: PluginStatus::Stopped,
        });
        accepted
    }

    /// Load every plugin a discovery mechanism provides.
    pub fn load_from(&self, discovery: &dyn PluginDiscovery) -> Result<usize, PluginError> {
        let plugins = discovery.discover()?;
        let count = plugins.len();
        for plugin in plugins {
            self.load(plugin);
        }
        Ok(count)
    }

    /// Start every plugin, returning how many are running afterwards.
    pub async fn start_all(&self, config: &PluginConfig) -> usize {
        self.shutting_down.store(false, Ordering::Release);
        let plugins: Vec<Arc<dyn Plugin>> =
            self.plugins.read().iter().map(|p| Arc::clone(&p.plugin)).collect();

        let mut started = Vec::with_capacity(plugins.len());
        for plugin in &plugins {
            let span = spans::plugin(plugin.name(), "start");
            let result = AssertUnwindSafe(plugin.start(config, self.callback.clone()))
                .catch_unwind()
                .instrument(span)
                .await;

            match result {
                Ok(Ok(())) => {
                    info!(plugin = %plugin.name(), "Plugin started");
                    started.push(Arc::clone(plugin));
                }
                Ok(Err(e)) => warn!(plugin = %plugin.name(), error = %e, "Plugin failed to start"),
                Err(_) => error!(plugin = %plugin.name(), "Plugin panicked during start"),
            }
        }

        self.set_status(&started, PluginStatus::Running);
        self.plugins
            .read()
            .iter()
            .filter(|p| p.status == PluginStatus::Running)
            .count()
    }

    /// Stop every plugin in load order.
    pub async fn stop_all(&self) {
        let plugins: Vec<Arc<dyn Plugin>> =
            self.plugins.read().iter().map(|p| Arc::clone(&p.plugin)).collect();
        if plugins.is_empty() {
            return;
        }
        self.shutting_down.store(true, Ordering::Release);

        for plugin in &plugins {
            let span = spans::plugin(plugin.name(), "stop");
            let result = AssertUnwindSafe(plugin.stop())
                .catch_unwind()
                .instrument(span)
                .await;

            match result {
                Ok(Ok(())) => info!(plugin = %plugin.name(), "Plugin stopped"),
                Ok(Err(e)) => warn!(plugin = %plugin.name(), error = %e, "Plugin failed to stop"),
                Err(_) => error!(plugin = %plugin.name(), "Plugin panicked during stop"),
            }
        }

        self.set_status(&plugins, PluginStatus::Stopped);
    }

    /// Dispatch a message to the registered compositions.
    pub async fn dispatch(&self, message: Arc<Message>) -> DispatchReport {
        self.registry.dispatch(message).await
    }

    fn set_status(&self, plugins: &[Arc<dyn Plugin>], status: PluginStatus) {
        let mut loaded = self.plugins.write();
        for instance in loaded.iter_mut() {
            if plugins.iter().any(|p| Arc::ptr_eq(p, &instance.plugin)) {
                instance.status = status;
            }
        }
    }
}
