//! In-process cart change notifications.
//!
//! Every cart mutation publishes a [`CartUpdated`] on a single broadcast
//! channel. SSE subscribers filter the channel down to their own cart, so
//! other tabs and devices showing the same cart can re-read it.

use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// SSE event name for cart changes.
pub const CART_UPDATED: &str = "cartUpdated";

/// A cart changed.
#[derive(Debug, Clone, Serialize)]
pub struct CartUpdated {
    #[serde(skip)]
    pub cart_id: Arc<str>,
    pub item_count: u32,
}

/// Broadcast hub for cart changes.
#[derive(Clone)]
pub struct CartEvents {
    sender: broadcast::Sender<CartUpdated>,
}

impl Default for CartEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl CartEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn publish(&self, cart_id: &str, item_count: u32) {
        let receivers = self
            .sender
            .send(CartUpdated {
                cart_id: Arc::from(cart_id),
                item_count,
            })
            .unwrap_or(0);
        tracing::debug!(cart_id, item_count, receivers, "cartUpdated published");
    }

    /// Stream of changes to one cart.
    ///
    /// Lagged subscribers skip the dropped events and keep listening; the
    /// stream ends when the hub is dropped.
    pub fn subscribe(&self, cart_id: String) -> impl Stream<Item = CartUpdated> + Send + 'static + use<> {
        let mut receiver = self.sender.subscribe();
        stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) if *event.cart_id == *cart_id => yield event,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(cart_id = %cart_id, skipped, "cart event subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

impl std::fmt::Debug for CartEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartEvents")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::pin::pin;
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_subscriber_only_sees_its_cart() {
        let events = CartEvents::new();
        let mut mine = pin!(events.subscribe("cart-a".to_string()));

        events.publish("cart-b", 7);
        events.publish("cart-a", 3);

        let event = tokio::time::timeout(Duration::from_secs(1), mine.next())
            .await
            .ok()
            .flatten();
        assert_eq!(event.map(|e| e.item_count), Some(3));
    }

    #[test]
    fn test_publish_without_subscribers() {
        CartEvents::new().publish("cart-a", 1);
    }

    #[test]
    fn test_payload_omits_cart_id() {
        let json = serde_json::to_value(CartUpdated {
            cart_id: Arc::from("cart-a"),
            item_count: 2,
        })
        .ok();
        assert_eq!(json, Some(serde_json::json!({"item_count": 2})));
    }
}
