//! Outbound email.
//!
//! Delivery is simulated: the dispatcher waits a fixed delay and reports
//! success. Callers only ever look at success or failure.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreError;

#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), StoreError>;
}

/// A message accepted by [`SimulatedMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Dispatcher that sleeps, records the message and always succeeds.
pub struct SimulatedMailer {
    delay: Duration,
    outbox: Mutex<Vec<SentEmail>>,
}

impl SimulatedMailer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentEmail> {
        self.outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl EmailDispatcher for SimulatedMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), StoreError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });

        tracing::info!(to, subject, "Email sent");
        Ok(())
    }
}
