//! Cross-context notification.
//!
//! One-directional: a context that has committed an artifact announces it;
//! it never waits for a consumer to act on it.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use recap_core::{ArtifactEvent, Envelope};
use tokio::sync::broadcast;

use crate::errors::NotifyError;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// Acknowledgement returned by [`Notifier::send`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ack {
    /// Number of live consumers the event reached.
    pub delivered: usize,
}

/// Broadcast channel to other live contexts.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce an event. Having no live consumers is not an error.
    async fn send(&self, event: ArtifactEvent) -> Result<Ack, NotifyError>;
}

/// In-process hub backed by a `tokio::sync::broadcast` channel.
///
/// Non-blocking: slow receivers lag rather than holding up senders.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Envelope>,
    sent: AtomicU64,
}

impl BroadcastNotifier {
    /// Create a hub with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a hub with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            sent: AtomicU64::new(0),
        }
    }

    /// Receive every envelope published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// A sending handle that stamps envelopes with `label`.
    pub fn context(&self, label: impl Into<String>) -> ContextNotifier {
        ContextNotifier {
            tx: self.tx.clone(),
            sender: Some(label.into()),
        }
    }

    /// Total events published through this hub (not its context handles).
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn send(&self, event: ArtifactEvent) -> Result<Ack, NotifyError> {
        let _ = self.sent.fetch_add(1, Ordering::Relaxed);
        let delivered = self.tx.send(Envelope { sender: None, event }).unwrap_or(0);
        Ok(Ack { delivered })
    }
}

/// Sending handle bound to one context label.
#[derive(Clone)]
pub struct ContextNotifier {
    tx: broadcast::Sender<Envelope>,
    sender: Option<String>,
}

#[async_trait]
impl Notifier for ContextNotifier {
    async fn send(&self, event: ArtifactEvent) -> Result<Ack, NotifyError> {
        let envelope = Envelope {
            sender: self.sender.clone(),
            event,
        };
        let delivered = self.tx.send(envelope).unwrap_or(0);
        Ok(Ack { delivered })
    }
}
