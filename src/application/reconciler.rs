use crate::domain::audit::{AuditAction, PaymentAuditEntry};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{AuditLogBox, PaymentStoreBox};
use crate::error::Result;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

/// An asynchronous confirmation event from the external card gateway,
/// correlated to a local payment via the stored charge reference.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub reference: String,
    pub kind: GatewayEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEventKind {
    ChargeSucceeded,
    ChargeFailed { code: String, message: String },
    ChargeRefunded { amount: Decimal },
}

/// How a single event application ended. Everything here is a success from
/// the delivery point of view; the gateway gets no error for replays or
/// unknown references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The payment advanced to a new state.
    Applied,
    /// Replay of an event whose effect is already in place.
    AlreadyApplied,
    /// No local payment carries this reference. Legitimate: the gateway
    /// also delivers events for other tenants' data and test traffic.
    UnknownReference,
    /// The event contradicts a terminal state (for example a stale failure
    /// after completion). The one-directional machine wins; flagged for
    /// operator attention.
    Conflicted,
}

/// Consumes gateway events and advances payment state idempotently.
///
/// Events arrive at-least-once and possibly out of order; every transition
/// checks the current status first, so any arrival order is safe.
pub struct GatewayEventReconciler {
    payments: PaymentStoreBox,
    audit_log: AuditLogBox,
}

impl GatewayEventReconciler {
    pub fn new(payments: PaymentStoreBox, audit_log: AuditLogBox) -> Self {
        Self {
            payments,
            audit_log,
        }
    }

    pub async fn apply(&self, event: GatewayEvent) -> Result<ReconcileOutcome> {
        let Some(mut payment) = self.payments.find_by_external_ref(&event.reference).await? else {
            tracing::info!(
                reference = %event.reference,
                "gateway event matches no local payment; ignoring"
            );
            return Ok(ReconcileOutcome::UnknownReference);
        };

        let outcome = match &event.kind {
            GatewayEventKind::ChargeSucceeded => match payment.status {
                PaymentStatus::Completed => ReconcileOutcome::AlreadyApplied,
                PaymentStatus::Pending => {
                    payment.complete(payment.amount)?;
                    self.payments.update(payment.clone()).await?;
                    self.audit(
                        payment.id,
                        AuditAction::CreditCardPaymentSucceeded,
                        json!({ "reference": event.reference, "origin": "gateway_event" }),
                    )
                    .await;
                    self.audit(
                        payment.id,
                        AuditAction::PaymentSucceeded,
                        json!({ "amount_applied": payment.amount, "origin": "gateway_event" }),
                    )
                    .await;
                    ReconcileOutcome::Applied
                }
                PaymentStatus::Failed | PaymentStatus::Refunded => ReconcileOutcome::Conflicted,
            },
            GatewayEventKind::ChargeFailed { code, message } => match payment.status {
                PaymentStatus::Failed => ReconcileOutcome::AlreadyApplied,
                PaymentStatus::Pending => {
                    payment.fail(format!("{code}: {message}"))?;
                    self.payments.update(payment.clone()).await?;
                    self.audit(
                        payment.id,
                        AuditAction::CreditCardPaymentFailed,
                        json!({ "code": code, "message": message, "origin": "gateway_event" }),
                    )
                    .await;
                    self.audit(
                        payment.id,
                        AuditAction::PaymentFailed,
                        json!({ "code": code, "message": message, "origin": "gateway_event" }),
                    )
                    .await;
                    ReconcileOutcome::Applied
                }
                PaymentStatus::Completed | PaymentStatus::Refunded => ReconcileOutcome::Conflicted,
            },
            GatewayEventKind::ChargeRefunded { amount } => match payment.status {
                PaymentStatus::Refunded => ReconcileOutcome::AlreadyApplied,
                PaymentStatus::Completed => {
                    payment.refund()?;
                    self.payments.update(payment.clone()).await?;
                    self.audit(
                        payment.id,
                        AuditAction::RefundCompleted,
                        json!({ "amount": amount, "origin": "gateway_event" }),
                    )
                    .await;
                    ReconcileOutcome::Applied
                }
                PaymentStatus::Pending | PaymentStatus::Failed => ReconcileOutcome::Conflicted,
            },
        };

        match outcome {
            ReconcileOutcome::Applied => tracing::info!(
                payment_id = %payment.id,
                reference = %event.reference,
                status = %payment.status,
                "gateway event applied"
            ),
            ReconcileOutcome::AlreadyApplied => tracing::info!(
                payment_id = %payment.id,
                reference = %event.reference,
                "gateway event replayed; no-op"
            ),
            ReconcileOutcome::Conflicted => tracing::warn!(
                payment_id = %payment.id,
                reference = %event.reference,
                status = %payment.status,
                "gateway event contradicts current payment state"
            ),
            ReconcileOutcome::UnknownReference => {}
        }

        Ok(outcome)
    }

    async fn audit(&self, payment_id: Uuid, action: AuditAction, detail: serde_json::Value) {
        let entry = PaymentAuditEntry::new(payment_id, action, detail);
        if let Err(error) = self.audit_log.append(entry).await {
            tracing::warn!(%payment_id, action = %action, %error, "audit write failed");
        }
    }
}
