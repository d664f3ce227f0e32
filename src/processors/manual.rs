use super::{ProcessorOutcome, SourceProcessor};
use crate::domain::payment::{Payment, PaymentSource};
use async_trait::async_trait;

/// Records cash and other out-of-band payments.
///
/// Always succeeds once invoked; it exists so manually-settled payments
/// leave the same audit trail as every other method.
pub struct ManualProcessor;

#[async_trait]
impl SourceProcessor for ManualProcessor {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn process(&self, payment: &Payment, _source: &PaymentSource) -> ProcessorOutcome {
        ProcessorOutcome::Approved {
            external_ref: None,
            amount_applied: payment.amount,
        }
    }
}
