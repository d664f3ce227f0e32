use super::{ProcessorOutcome, SourceProcessor};
use crate::domain::payment::{Payment, PaymentSource};
use crate::domain::ports::{CardGatewayBox, ChargeOutcome, ChargeRequest};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

/// Creates a single-capture charge at the card gateway.
///
/// The local payment id doubles as the gateway idempotency key, and the
/// call carries a bounded timeout: a hung gateway rolls the payment back
/// rather than leaving it pending forever, with webhook reconciliation as
/// the backstop for charges that went through anyway.
pub struct CardProcessor {
    gateway: CardGatewayBox,
    minimum: Decimal,
    timeout: Duration,
}

impl CardProcessor {
    pub fn new(gateway: CardGatewayBox, minimum: Decimal, timeout: Duration) -> Self {
        Self {
            gateway,
            minimum,
            timeout,
        }
    }
}

#[async_trait]
impl SourceProcessor for CardProcessor {
    fn name(&self) -> &'static str {
        "card"
    }

    async fn process(&self, payment: &Payment, source: &PaymentSource) -> ProcessorOutcome {
        let PaymentSource::Card(card) = source else {
            return ProcessorOutcome::Declined {
                reason: "card processor invoked without card details".to_string(),
            };
        };
        if payment.amount < self.minimum {
            return ProcessorOutcome::Declined {
                reason: format!(
                    "amount {} is below the gateway minimum of {}",
                    payment.amount, self.minimum
                ),
            };
        }

        let request = ChargeRequest {
            idempotency_key: payment.id,
            amount: payment.amount,
            card: card.clone(),
        };

        match tokio::time::timeout(self.timeout, self.gateway.create_charge(request)).await {
            Err(_) => ProcessorOutcome::Declined {
                reason: format!(
                    "gateway {} did not answer within {:?}",
                    self.gateway.name(),
                    self.timeout
                ),
            },
            Ok(Err(error)) => ProcessorOutcome::Declined {
                reason: error.to_string(),
            },
            Ok(Ok(ChargeOutcome::Succeeded { reference })) => ProcessorOutcome::Approved {
                external_ref: Some(reference),
                amount_applied: payment.amount,
            },
            Ok(Ok(ChargeOutcome::RequiresAction { reference })) => {
                ProcessorOutcome::ActionRequired {
                    external_ref: reference,
                }
            }
            Ok(Ok(ChargeOutcome::Declined { code, message })) => ProcessorOutcome::Declined {
                reason: format!("{code}: {message}"),
            },
        }
    }
}
