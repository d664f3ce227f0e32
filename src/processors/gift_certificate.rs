use super::{ProcessorOutcome, SourceProcessor};
use crate::domain::certificate::normalize_code;
use crate::domain::payment::{Amount, Payment, PaymentSource};
use crate::domain::ports::CertificateStoreBox;
use async_trait::async_trait;
use chrono::Utc;

/// Redeems a stored-value certificate against the payment amount.
///
/// Partial coverage is a success with the applied amount; covering the
/// remainder is the caller's job, via a second payment and another source.
pub struct GiftCertificateProcessor {
    certificates: CertificateStoreBox,
}

impl GiftCertificateProcessor {
    pub fn new(certificates: CertificateStoreBox) -> Self {
        Self { certificates }
    }
}

#[async_trait]
impl SourceProcessor for GiftCertificateProcessor {
    fn name(&self) -> &'static str {
        "gift_certificate"
    }

    async fn process(&self, payment: &Payment, source: &PaymentSource) -> ProcessorOutcome {
        let PaymentSource::GiftCertificate { code } = source else {
            return ProcessorOutcome::Declined {
                reason: "gift certificate processor invoked without a certificate code".to_string(),
            };
        };
        let requested = match Amount::new(payment.amount) {
            Ok(amount) => amount,
            Err(error) => {
                return ProcessorOutcome::Declined {
                    reason: error.to_string(),
                };
            }
        };

        let normalized = normalize_code(code);
        match self
            .certificates
            .redeem(&normalized, requested, Utc::now())
            .await
        {
            Ok(redemption) => ProcessorOutcome::Approved {
                external_ref: None,
                amount_applied: redemption.amount_applied,
            },
            Err(error) => ProcessorOutcome::Declined {
                reason: error.to_string(),
            },
        }
    }
}
