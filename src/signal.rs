use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Logout notification shared between session contexts. The timestamp
/// is the value recorded durably; the origin id lets a context skip
/// its own broadcast, the way the tab that writes a storage key never
/// sees its own storage event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutSignal {
    pub at: DateTime<Utc>,
    pub origin: Uuid,
}

/// Transport for logout signals between contexts.
///
/// The default [`InProcessChannel`] covers contexts sharing a process.
/// An embedder with contexts in separate processes implements this by
/// bridging its own medium into a broadcast channel.
pub trait SignalChannel: Send + Sync {
    /// Publish a signal to every peer context. Best-effort: with no
    /// subscribers the signal is dropped.
    fn publish(&self, signal: LogoutSignal);

    /// Subscribe to signals published on this channel.
    fn subscribe(&self) -> broadcast::Receiver<LogoutSignal>;
}

/// In-process fan-out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct InProcessChannel {
    tx: broadcast::Sender<LogoutSignal>,
}

impl InProcessChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self { tx }
    }
}

impl Default for InProcessChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalChannel for InProcessChannel {
    fn publish(&self, signal: LogoutSignal) {
        // Ignore if no peer is listening.
        let _ = self.tx.send(signal);
    }

    fn subscribe(&self) -> broadcast::Receiver<LogoutSignal> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let channel = InProcessChannel::new();
        let mut rx_a = channel.subscribe();
        let mut rx_b = channel.subscribe();

        let signal = LogoutSignal {
            at: Utc::now(),
            origin: Uuid::new_v4(),
        };
        channel.publish(signal.clone());

        assert_eq!(rx_a.recv().await.unwrap(), signal);
        assert_eq!(rx_b.recv().await.unwrap(), signal);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let channel = InProcessChannel::new();
        channel.publish(LogoutSignal {
            at: Utc::now(),
            origin: Uuid::new_v4(),
        });
        // Late subscriber sees nothing from before it joined
        let mut rx = channel.subscribe();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
