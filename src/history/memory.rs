//! In-memory history backed by a bounded ring buffer.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use slirc_proto::Message;

use super::{DateTimeOrdinal, HistoryError, HistoryProvider};

/// Keeps the most recent messages in memory.
///
/// With a capacity of 0 nothing is ever evicted.
pub struct MemoryHistory {
    messages: RwLock<VecDeque<Arc<Message>>>,
    capacity: usize,
}

impl MemoryHistory {
    /// Unbounded history.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryProvider for MemoryHistory {
    async fn store(&self, message: Arc<Message>) -> Result<(), HistoryError> {
        let mut messages = self.messages.write();
        if self.capacity > 0 && messages.len() >= self.capacity {
            messages.pop_front();
        }
        messages.push_back(message);
        Ok(())
    }

    async fn range(&self, start: usize, end: usize) -> Result<Vec<Arc<Message>>, HistoryError> {
        let messages = self.messages.read();
        let end = end.min(messages.len());
        if start >= end {
            return Ok(vec![]);
        }
        Ok(messages.range(start..end).cloned().collect())
    }

    async fn around(
        &self,
        time: DateTime<Utc>,
        ordinal: DateTimeOrdinal,
    ) -> Result<Vec<Arc<Message>>, HistoryError> {
        Ok(self
            .messages
            .read()
            .iter()
            .filter(|m| ordinal.matches(m.timestamp, time))
            .cloned()
            .collect())
    }

    async fn len(&self) -> usize {
        self.messages.read().len()
    }
}
