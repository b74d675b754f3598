//! Realtime message feed.
//!
//! Successful sends are published to an in-process broadcast channel; the
//! chat long-poll endpoint subscribes, skips messages addressed to other
//! accounts, and returns the first match. Clients re-poll immediately on
//! timeout, so a thread that is open receives new bubbles without a refetch.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::models::Message;

/// How long one poll waits before returning empty-handed.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// Broadcast feed of inserted messages.
#[derive(Debug, Clone)]
pub struct MessageFeed {
    tx: broadcast::Sender<Message>,
}

impl Default for MessageFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Publish an inserted message. Nobody listening is fine.
    pub fn publish(&self, message: Message) {
        let _ = self.tx.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }

    /// Wait for the next message addressed to `receiver_id`.
    ///
    /// Subscribes before waiting, skips messages for other accounts, and
    /// returns `None` on timeout or when the channel lags/closes — the
    /// caller simply polls again.
    pub async fn poll(&self, receiver_id: &str, wait: Duration) -> Option<Message> {
        let mut rx = self.subscribe();

        let result = timeout(wait, async {
            loop {
                match rx.recv().await {
                    Ok(message) if message.receiver_id == receiver_id => {
                        return Some(message);
                    }
                    Ok(_) => {
                        // Addressed to a different account, keep waiting
                        continue;
                    }
                    Err(_) => {
                        // Channel closed or lagged, bail out
                        return None;
                    }
                }
            }
        })
        .await;

        result.unwrap_or(None)
    }
}
