//! Muezzin Push Delivery
//!
//! Formats messages for the push gateway, posts them, and reduces every reply
//! to a `DeliveryOutcome`:
//! - `Delivered`
//! - `StaleRegistration` (the token is dead, quarantine it)
//! - `TransientFailure` (try again on a later tick)

mod error;
mod expo;
mod message;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod response;

pub use error::{PushError, Result};
pub use expo::ExpoGateway;
pub use message::{PushMessage, Sound};
pub use response::{classify_response, classify_ticket, is_stale_code, DeliveryOutcome, STALE_CODES};

use async_trait::async_trait;

/// Trait for push delivery backends
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver one message
    async fn send(&self, message: &PushMessage) -> DeliveryOutcome;

    /// Deliver several messages in one request; one outcome per message, in
    /// order
    async fn send_batch(&self, messages: &[PushMessage]) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(messages.len());
        for message in messages {
            outcomes.push(self.send(message).await);
        }
        outcomes
    }
}
