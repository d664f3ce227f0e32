mod common;

use common::{TestEngine, owner};
use payledger::application::orchestrator::{PaymentRequest, ReceiptOutcome};
use payledger::application::reconciler::{GatewayEvent, GatewayEventKind, ReconcileOutcome};
use payledger::domain::payment::{CardDetails, PaymentSource, PaymentStatus};
use payledger::domain::ports::{AuditLog, PaymentStore};
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

fn succeeded(reference: &str) -> GatewayEvent {
    GatewayEvent {
        reference: reference.to_string(),
        kind: GatewayEventKind::ChargeSucceeded,
    }
}

fn failed(reference: &str) -> GatewayEvent {
    GatewayEvent {
        reference: reference.to_string(),
        kind: GatewayEventKind::ChargeFailed {
            code: "card_declined".to_string(),
            message: "declined by issuer".to_string(),
        },
    }
}

fn refunded(reference: &str, amount: rust_decimal::Decimal) -> GatewayEvent {
    GatewayEvent {
        reference: reference.to_string(),
        kind: GatewayEventKind::ChargeRefunded { amount },
    }
}

/// Creates a card payment left pending with reference `ch_1`.
async fn pending_charge(engine: &TestEngine) -> Uuid {
    engine.register_appointment("apt-1", dec!(20.0)).await;
    let receipt = engine
        .orchestrator
        .process_payment(
            PaymentRequest {
                appointment_id: "apt-1".to_string(),
                amount: dec!(20.0),
                source: card(),
                retry_attempt: 0,
            },
            &owner(),
        )
        .await
        .unwrap();
    assert_eq!(receipt.outcome, ReceiptOutcome::RequiresAction);
    receipt.payment_id
}

#[tokio::test]
async fn test_success_event_completes_pending_payment() {
    let engine = TestEngine::new(MockBehavior::RequireAction);
    let payment_id = pending_charge(&engine).await;

    let outcome = engine.reconciler.apply(succeeded("ch_1")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);

    let payment = engine.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.amount_applied, Some(dec!(20.0)));
}

#[tokio::test]
async fn test_success_event_replay_is_a_noop() {
    let engine = TestEngine::new(MockBehavior::RequireAction);
    let payment_id = pending_charge(&engine).await;

    engine.reconciler.apply(succeeded("ch_1")).await.unwrap();
    let entries_before = engine.audit.list_by_payment(payment_id).await.unwrap().len();

    let outcome = engine.reconciler.apply(succeeded("ch_1")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyApplied);

    // A replay changes neither the payment nor the audit trail.
    let entries_after = engine.audit.list_by_payment(payment_id).await.unwrap().len();
    assert_eq!(entries_before, entries_after);
    let payment = engine.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_failure_event_fails_pending_payment() {
    let engine = TestEngine::new(MockBehavior::RequireAction);
    let payment_id = pending_charge(&engine).await;

    let outcome = engine.reconciler.apply(failed("ch_1")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);

    let payment = engine.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(
        payment.failure_reason.as_deref(),
        Some("card_declined: declined by issuer")
    );

    let replay = engine.reconciler.apply(failed("ch_1")).await.unwrap();
    assert_eq!(replay, ReconcileOutcome::AlreadyApplied);
}

#[tokio::test]
async fn test_refund_event_refunds_completed_payment() {
    let engine = TestEngine::new(MockBehavior::AlwaysApprove);
    engine.register_appointment("apt-1", dec!(20.0)).await;
    let receipt = engine
        .orchestrator
        .process_payment(
            PaymentRequest {
                appointment_id: "apt-1".to_string(),
                amount: dec!(20.0),
                source: card(),
                retry_attempt: 0,
            },
            &owner(),
        )
        .await
        .unwrap();
    assert_eq!(receipt.outcome, ReceiptOutcome::Completed);

    let outcome = engine
        .reconciler
        .apply(refunded("ch_1", dec!(20.0)))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);

    let payment = engine.payments.get(receipt.payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn test_unknown_reference_is_ignored() {
    let engine = TestEngine::new(MockBehavior::RequireAction);
    pending_charge(&engine).await;

    let outcome = engine.reconciler.apply(succeeded("ch_999")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::UnknownReference);
}

#[tokio::test]
async fn test_stale_events_against_terminal_states_conflict() {
    let engine = TestEngine::new(MockBehavior::RequireAction);
    let payment_id = pending_charge(&engine).await;

    // Settle the payment, then replay contradicting deliveries.
    engine.reconciler.apply(succeeded("ch_1")).await.unwrap();

    let outcome = engine.reconciler.apply(failed("ch_1")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Conflicted);
    let payment = engine.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);

    // Once refunded, a stale success is also a conflict.
    engine
        .reconciler
        .apply(refunded("ch_1", dec!(20.0)))
        .await
        .unwrap();
    let outcome = engine.reconciler.apply(succeeded("ch_1")).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Conflicted);
    let payment = engine.payments.get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
}
