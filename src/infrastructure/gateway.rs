use crate::domain::ports::{CardGateway, ChargeOutcome, ChargeRequest};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Scripted stand-in for the external card gateway.
///
/// References are drawn from a shared counter (`ch_1`, `ch_2`, ...) so CLI
/// runs and tests are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    AlwaysApprove,
    AlwaysDecline,
    RequireAction,
    /// Never answers; used to exercise the charge timeout path.
    Hang,
}

#[derive(Clone)]
pub struct MockCardGateway {
    behavior: MockBehavior,
    counter: Arc<AtomicU64>,
}

impl MockCardGateway {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    fn next_reference(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}_{n}")
    }
}

#[async_trait]
impl CardGateway for MockCardGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_charge(&self, _request: ChargeRequest) -> Result<ChargeOutcome> {
        match self.behavior {
            MockBehavior::AlwaysApprove => Ok(ChargeOutcome::Succeeded {
                reference: self.next_reference("ch"),
            }),
            MockBehavior::AlwaysDecline => Ok(ChargeOutcome::Declined {
                code: "card_declined".to_string(),
                message: "insufficient funds".to_string(),
            }),
            MockBehavior::RequireAction => Ok(ChargeOutcome::RequiresAction {
                reference: self.next_reference("ch"),
            }),
            MockBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ChargeOutcome::Declined {
                    code: "timeout".to_string(),
                    message: "gateway never answered".to_string(),
                })
            }
        }
    }

    async fn create_refund(&self, _reference: &str, _amount: Decimal) -> Result<String> {
        Ok(self.next_reference("re"))
    }
}
