//! Plugin host and command dispatch.
//!
//! Plugins contribute [`Composition`]s: handlers bound to command tokens.
//! The [`Registry`] maps each token to its compositions and dispatches
//! inbound messages to them; the [`PluginHost`] manages plugin lifecycle;
//! plugins talk back to the client through a [`PluginCallback`].

mod builtin;
mod callback;
mod composition;
mod discovery;
mod host;
mod registry;

pub use builtin::CorePlugin;
pub use callback::{PluginAction, PluginCallback};
pub use composition::{Composition, CompositionHandler};
pub use discovery::{PluginDiscovery, StaticDiscovery};
pub use host::{Plugin, PluginHost, PluginInstance, PluginStatus};
pub use registry::{DispatchReport, Registry};
