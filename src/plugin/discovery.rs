//! Plugin discovery.
//!
//! How plugins are found is up to the embedder: a static list compiled
//! into the binary, a directory scan, a dynamic loader. The host only sees
//! the [`PluginDiscovery`] trait.

use std::sync::Arc;

use super::host::Plugin;
use crate::error::PluginError;

/// Source of plugins for the host.
pub trait PluginDiscovery: Send + Sync {
    fn discover(&self) -> Result<Vec<Arc<dyn Plugin>>, PluginError>;
}

/// Discovery backed by a fixed list of plugins.
#[derive(Default, Clone)]
pub struct StaticDiscovery {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn push(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginDiscovery for StaticDiscovery {
    fn discover(&self) -> Result<Vec<Arc<dyn Plugin>>, PluginError> {
        Ok(self.plugins.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginConfig;
    use crate::plugin::{Composition, PluginCallback};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn compositions(&self) -> Vec<Composition> {
            Vec::new()
        }

        async fn start(&self, _config: &PluginConfig, _callback: PluginCallback) -> Result<(), PluginError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), PluginError> {
            Ok(())
        }
    }

    #[test]
    fn static_discovery_keeps_order() {
        let discovery = StaticDiscovery::new()
            .with(Arc::new(Named("a")))
            .with(Arc::new(Named("b")));

        let names: Vec<String> = discovery
            .discover()
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(discovery.len(), 2);
    }
}
