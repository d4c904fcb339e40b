//! History provider abstraction.
//!
//! Every routable message the client receives can be kept for later
//! queries (bridges, plugins asking "what did I miss").

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slirc_proto::Message;
use thiserror::Error;

pub mod memory;
pub mod noop;

pub use memory::MemoryHistory;
pub use noop::NoOpHistory;

use crate::config::HistoryConfig;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history unavailable: {0}")]
    Unavailable(String),
}

/// Which side of a reference time a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeOrdinal {
    /// Messages stamped at or after the reference time.
    After,
    /// Messages stamped at or before the reference time.
    Before,
}

impl DateTimeOrdinal {
    pub fn matches(self, timestamp: DateTime<Utc>, reference: DateTime<Utc>) -> bool {
        match self {
            Self::After => timestamp >= reference,
            Self::Before => timestamp <= reference,
        }
    }
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Store a message.
    async fn store(&self, message: Arc<Message>) -> Result<(), HistoryError>;

    /// Messages by position, `start..end` clamped to what is stored.
    async fn range(&self, start: usize, end: usize) -> Result<Vec<Arc<Message>>, HistoryError>;

    /// Messages on one side of a point in time, oldest first.
    async fn around(
        &self,
        time: DateTime<Utc>,
        ordinal: DateTimeOrdinal,
    ) -> Result<Vec<Arc<Message>>, HistoryError>;

    /// Number of stored messages.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Build the provider selected by configuration.
pub fn from_config(config: &HistoryConfig) -> Arc<dyn HistoryProvider> {
    if config.enabled {
        Arc::new(MemoryHistory::with_capacity(config.capacity))
    } else {
        Arc::new(NoOpHistory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ordinal_bounds_are_inclusive() {
        let reference = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();

        assert!(DateTimeOrdinal::After.matches(reference, reference));
        assert!(DateTimeOrdinal::Before.matches(reference, reference));
        assert!(!DateTimeOrdinal::After.matches(earlier, reference));
        assert!(DateTimeOrdinal::Before.matches(earlier, reference));
    }

    #[tokio::test]
    async fn disabled_history_stores_nothing() {
        let provider = from_config(&HistoryConfig {
            enabled: false,
            capacity: 10,
        });
        provider.store(Arc::new(Message::parse(":a!b@c PRIVMSG #x :hi"))).await.unwrap();
        assert!(provider.is_empty().await);
    }
}
