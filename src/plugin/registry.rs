//! Command registry and dispatcher.
//!
//! Maps upper-cased command tokens to the compositions triggered by them,
//! in registration order. Dispatch clones the handler list first so no map
//! lock is held while handlers run.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use slirc_proto::Message;
use tracing::{Instrument, debug, error, info, warn};

use super::callback::PluginCallback;
use super::composition::Composition;
use crate::error::PluginError;
use crate::telemetry::{HandlerTimer, spans};

/// Outcome of dispatching one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers invoked.
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.invoked - self.failed
    }
}

/// Registry of compositions keyed by command token.
pub struct Registry {
    handlers: DashMap<String, Vec<Composition>>,
    descriptions: DashMap<String, String>,
    callback: PluginCallback,
}

impl Registry {
    /// Create an empty registry whose handlers report to `callback`.
    pub fn new(callback: PluginCallback) -> Self {
        Self {
            handlers: DashMap::new(),
            descriptions: DashMap::new(),
            callback,
        }
    }

    /// Register a composition under each of its trigger commands.
    ///
    /// An invalid composition is logged and rejected without touching the
    /// registry. Duplicates are not rejected; each registration is invoked.
    pub fn register(&self, composition: Composition) -> Result<(), PluginError> {
        if let Err(e) = composition.validate() {
            warn!(error = %e, "Skipping invalid composition");
            return Err(e);
        }

        if let Some(description) = composition.description() {
            match self.descriptions.entry(composition.id().to_owned()) {
                Entry::Occupied(_) => {
                    warn!(id = %composition.id(), "Duplicate composition description ignored");
                }
                Entry::Vacant(entry) => {
                    entry.insert(description.to_owned());
                }
            }
        }

        for command in composition.commands() {
            self.handlers
                .entry(command.clone())
                .or_default()
                .push(composition.clone());
        }

        debug!(id = %composition.id(), commands = ?composition.commands(), "Composition registered");
        Ok(())
    }

    /// Register several compositions, returning how many were accepted.
    pub fn register_all(&self, compositions: impl IntoIterator<Item = Composition>) -> usize {
        compositions
            .into_iter()
            .map(|c| self.register(c))
            .filter(Result::is_ok)
            .count()
    }

    /// Run every composition triggered by the message's command.
    ///
    /// Handlers run one after another in registration order. Each runs
    /// inside its own failure boundary: an error or a panic is logged and
    /// counted, and the next handler still runs.
    pub async fn dispatch(&self, message: Arc<Message>) -> DispatchReport {
        let Some(command) = message.command() else {
            return DispatchReport::default();
        };
        let command = command.to_ascii_uppercase();

        let Some(compositions) = self.handlers.get(&command).map(|list| list.value().clone()) else {
            return DispatchReport::default();
        };

        let span = spans::dispatch(&command, &message.nickname, Some(message.origin.as_str()));
        async {
            let mut report = DispatchReport::default();

            for composition in compositions {
                report.invoked += 1;
                let _timer = HandlerTimer::new(composition.id());

                let handled = composition
                    .handler()
                    .handle(Arc::clone(&message), self.callback.clone());

                match AssertUnwindSafe(handled).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        report.failed += 1;
                        warn!(
                            composition = %composition.id(),
                            error = %e,
                            code = e.error_code(),
                            "Handler failed"
                        );
                    }
                    Err(panic) => {
                        report.failed += 1;
                        error!(
                            composition = %composition.id(),
                            panic = %panic_message(&*panic),
                            "Handler panicked"
                        );
                    }
                }
            }

            report
        }
        .instrument(span)
        .await
    }

    pub fn command_exists(&self, command: &str) -> bool {
        self.handlers.contains_key(&command.to_ascii_uppercase())
    }

    /// Description recorded for a composition id.
    pub fn description(&self, id: &str) -> Option<String> {
        self.descriptions.get(id).map(|d| d.value().clone())
    }

    /// All `(id, description)` pairs, sorted by id.
    pub fn descriptions(&self) -> Vec<(String, String)> {
        let mut all: Vec<_> = self
            .descriptions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        all.sort();
        all
    }

    /// Registered command tokens, sorted.
    pub fn commands(&self) -> Vec<String> {
        let mut commands: Vec<_> = self.handlers.iter().map(|e| e.key().clone()).collect();
        commands.sort();
        commands
    }

    /// Drop every registration.
    pub fn clear(&self) {
        let count = self.handlers.len();
        self.handlers.clear();
        self.descriptions.clear();
        info!(commands = count, "Registry cleared");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
