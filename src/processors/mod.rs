//! Source processors: one pluggable strategy per payment source, all
//! behind a uniform contract. A processor never fails the call itself;
//! every failure is communicated through the returned outcome so the
//! orchestrator owns rollback and auditing.

mod card;
mod gift_certificate;
mod manual;

pub use card::CardProcessor;
pub use gift_certificate::GiftCertificateProcessor;
pub use manual::ManualProcessor;

use crate::domain::payment::{Payment, PaymentSource};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Result of one processor invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorOutcome {
    Approved {
        external_ref: Option<String>,
        amount_applied: Decimal,
    },
    /// The charge was created but needs out-of-band customer
    /// authentication; the payment stays pending until the gateway event
    /// arrives.
    ActionRequired { external_ref: String },
    Declined { reason: String },
}

#[async_trait]
pub trait SourceProcessor: Send + Sync {
    fn name(&self) -> &'static str;
    async fn process(&self, payment: &Payment, source: &PaymentSource) -> ProcessorOutcome;
}
