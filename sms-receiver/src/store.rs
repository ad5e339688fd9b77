//! In-memory message store.
//!
//! Holds the body of every validated inbound SMS in arrival order. The store
//! is a cheap-to-clone handle; every clone shares the same underlying list.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

/// Shared, insertion-ordered list of message bodies.
///
/// Appends take the write lock and listings copy the list under the read
/// lock, so readers always see a consistent point-in-time snapshot.
#[derive(Clone, Debug, Default)]
pub struct MessageStore {
    inner: Arc<RwLock<VecDeque<String>>>,
    max_messages: Option<usize>,
}

impl MessageStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that evicts the oldest message once `max_messages`
    /// entries are held. `None` or `Some(0)` means unbounded.
    pub fn with_max_messages(max_messages: Option<usize>) -> Self {
        Self {
            inner: Arc::default(),
            max_messages: max_messages.filter(|&max| max > 0),
        }
    }

    /// Configured capacity, if any.
    pub fn max_messages(&self) -> Option<usize> {
        self.max_messages
    }

    /// Append a message, returning the number of messages held afterwards.
    pub async fn push(&self, message: String) -> usize {
        let mut messages = self.inner.write().await;

        if let Some(max) = self.max_messages {
            while messages.len() >= max {
                messages.pop_front();
                debug!(max_messages = max, "message_store_evicted_oldest");
            }
        }

        messages.push_back(message);
        messages.len()
    }

    /// Copy of all messages, oldest first.
    pub async fn snapshot(&self) -> Vec<String> {
        self.inner.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
