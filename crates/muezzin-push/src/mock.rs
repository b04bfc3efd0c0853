//! Mock gateway for testing

use crate::message::PushMessage;
use crate::response::DeliveryOutcome;
use crate::PushGateway;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A mock gateway that records every message and replies with scripted
/// outcomes
#[derive(Default)]
pub struct MockGateway {
    /// Messages that have been sent
    messages: Arc<Mutex<Vec<PushMessage>>>,
    /// Number of gateway requests (a batch counts once)
    call_count: AtomicUsize,
    /// One-shot outcomes, consumed in order
    script: Mutex<VecDeque<DeliveryOutcome>>,
    /// Fixed outcome per registration token
    by_token: Mutex<HashMap<String, DeliveryOutcome>>,
    /// Outcome when nothing else applies; `Delivered` if unset
    fallback: Option<DeliveryOutcome>,
}

impl MockGateway {
    /// Create a mock gateway that delivers everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock gateway that answers every message with `outcome`
    pub fn always(outcome: DeliveryOutcome) -> Self {
        Self {
            fallback: Some(outcome),
            ..Default::default()
        }
    }

    /// Create a mock gateway that always fails transiently
    pub fn failing() -> Self {
        Self::always(DeliveryOutcome::transient("mock failure"))
    }

    /// Answer messages to `token` with `outcome`
    pub fn with_token_outcome(mut self, token: impl Into<String>, outcome: DeliveryOutcome) -> Self {
        self.by_token.get_mut().insert(token.into(), outcome);
        self
    }

    /// Queue a one-shot outcome for the next message
    pub async fn push_outcome(&self, outcome: DeliveryOutcome) {
        self.script.lock().await.push_back(outcome);
    }

    /// Get the number of gateway requests made
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all sent messages
    pub async fn messages(&self) -> Vec<PushMessage> {
        self.messages.lock().await.clone()
    }

    /// Messages addressed to a token
    pub async fn sent_to(&self, token: &str) -> Vec<PushMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|m| m.to == token)
            .cloned()
            .collect()
    }

    /// Forget recorded messages and calls
    pub async fn reset(&self) {
        self.messages.lock().await.clear();
        self.call_count.store(0, Ordering::SeqCst);
    }

    async fn outcome_for(&self, message: &PushMessage) -> DeliveryOutcome {
        if let Some(outcome) = self.script.lock().await.pop_front() {
            return outcome;
        }
        if let Some(outcome) = self.by_token.lock().await.get(&message.to) {
            return outcome.clone();
        }
        self.fallback.clone().unwrap_or(DeliveryOutcome::Delivered)
    }
}

#[async_trait]
impl PushGateway for MockGateway {
    async fn send(&self, message: &PushMessage) -> DeliveryOutcome {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().await.push(message.clone());
        self.outcome_for(message).await
    }

    async fn send_batch(&self, messages: &[PushMessage]) -> Vec<DeliveryOutcome> {
        if messages.is_empty() {
            return Vec::new();
        }
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let mut outcomes = Vec::with_capacity(messages.len());
        for message in messages {
            self.messages.lock().await.push(message.clone());
            outcomes.push(self.outcome_for(message).await);
        }
        outcomes
    }
}
