//! No-op history provider that discards all messages.
//!
//! Used when history storage is disabled.
//! All operations succeed but store nothing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slirc_proto::Message;

use super::{DateTimeOrdinal, HistoryError, HistoryProvider};

pub struct NoOpHistory;

#[async_trait]
impl HistoryProvider for NoOpHistory {
    async fn store(&self, _message: Arc<Message>) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn range(&self, _start: usize, _end: usize) -> Result<Vec<Arc<Message>>, HistoryError> {
        Ok(vec![])
    }

    async fn around(
        &self,
        _time: DateTime<Utc>,
        _ordinal: DateTimeOrdinal,
    ) -> Result<Vec<Arc<Message>>, HistoryError> {
        Ok(vec![])
    }

    async fn len(&self) -> usize {
        0
    }
}
