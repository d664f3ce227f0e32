mod common;

use common::{TestEngine, owner};
use payledger::application::orchestrator::{PaymentRequest, ReceiptOutcome};
use payledger::application::reconciler::{GatewayEvent, GatewayEventKind, ReconcileOutcome};
use payledger::domain::audit::AuditAction;
use payledger::domain::payment::{CardDetails, PaymentSource, PaymentStatus};
use payledger::domain::ports::{AuditLog, PaymentStore};
use payledger::error::PaymentError;
use payledger::infrastructure::gateway::MockBehavior;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn card() -> PaymentSource {
    PaymentSource::Card(CardDetails {
        number: "4242424242424242".to_string(),
        exp_month: 12,
        exp_year: 2030,
        name: "Test Cardholder".to_string(),
    })
}

async fn charge(engine: &TestEngine, source: PaymentSource) -> Uuid {
    engine.register_appointment("apt-1", dec!(20.0)).await;
    let receipt = engine
        .orchestrator
        .process_payment(
            PaymentRequest {
                appointment_id: "apt-1".to_string(),
                amount: dec!(20.0),
                source,
                retry_attempt: 0,
            },
            &owner(),
        )
        .await
        .unwrap();
    receipt.payment_id
}

#[tokio::test]
async fn test_manual_refund_settles_immediately() {
    let engine = TestEngine::new(MockBehavior::AlwaysApprove);
    let payment_id = charge(&engine, PaymentSource::Cash { note: None }).await;

    engine
        .orchestrator
        .initiate_refund(payment_id, &owner())
        .await
        .unwrap();

    let payment = engine.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);

    let actions: Vec<AuditAction> = engine
        .audit
        .list_by_payment(payment_id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.action)
        .collect();
    assert!(actions.contains(&AuditAction::RefundInitiated));
    assert!(actions.contains(&AuditAction::RefundCompleted));
    assert!(!actions.contains(&AuditAction::GatewayRefundCreated));
}

#[tokio::test]
async fn test_card_refund_waits_for_gateway_confirmation() {
    let engine = TestEngine::new(MockBehavior::AlwaysApprove);
    let payment_id = charge(&engine, card()).await;

    engine
        .orchestrator
        .initiate_refund(payment_id, &owner())
        .await
        .unwrap();

    // Initiation alone does not settle a card refund.
    let payment = engine.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);

    let actions: Vec<AuditAction> = engine
        .audit
        .list_by_payment(payment_id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.action)
        .collect();
    assert!(actions.contains(&AuditAction::GatewayRefundCreated));
    assert!(!actions.contains(&AuditAction::RefundCompleted));

    // The confirmation event, correlated by the charge reference, settles it.
    let outcome = engine
        .reconciler
        .apply(GatewayEvent {
            reference: "ch_1".to_string(),
            kind: GatewayEventKind::ChargeRefunded {
                amount: dec!(20.0),
            },
        })
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);

    let payment = engine.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn test_refund_requires_completed_payment() {
    let engine = TestEngine::new(MockBehavior::RequireAction);
    let payment_id = charge(&engine, card()).await;

    // The charge is still pending customer authentication.
    let err = engine
        .orchestrator
        .initiate_refund(payment_id, &owner())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PaymentError::InvalidTransition {
            from: PaymentStatus::Pending,
            to: PaymentStatus::Refunded,
        }
    ));
}

#[tokio::test]
async fn test_refund_rejects_unknown_payment_and_foreign_tenant() {
    let engine = TestEngine::new(MockBehavior::AlwaysApprove);

    let err = engine
        .orchestrator
        .initiate_refund(Uuid::new_v4(), &owner())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotFound(_)));

    let payment_id = charge(&engine, PaymentSource::Cash { note: None }).await;
    let mut intruder = owner();
    intruder.tenant_id = "salon-2".to_string();
    let err = engine
        .orchestrator
        .initiate_refund(payment_id, &intruder)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Unauthorized(_)));
}
