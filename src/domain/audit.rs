use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed vocabulary of audit actions. New entries are a deliberate schema
/// change, not an ad-hoc string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SourceSelected,
    GiftCertificatePaymentAttempt,
    GiftCertificatePaymentSucceeded,
    GiftCertificatePaymentFailed,
    CreditCardPaymentAttempt,
    GatewayChargeCreated,
    CreditCardPaymentSucceeded,
    CreditCardPaymentFailed,
    ManualPaymentProcessed,
    PaymentSucceeded,
    PaymentFailed,
    PaymentRolledBack,
    RollbackFailed,
    RefundInitiated,
    GatewayRefundCreated,
    RefundCompleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceSelected => "source_selected",
            Self::GiftCertificatePaymentAttempt => "gift_certificate_payment_attempt",
            Self::GiftCertificatePaymentSucceeded => "gift_certificate_payment_succeeded",
            Self::GiftCertificatePaymentFailed => "gift_certificate_payment_failed",
            Self::CreditCardPaymentAttempt => "credit_card_payment_attempt",
            Self::GatewayChargeCreated => "gateway_charge_created",
            Self::CreditCardPaymentSucceeded => "credit_card_payment_succeeded",
            Self::CreditCardPaymentFailed => "credit_card_payment_failed",
            Self::ManualPaymentProcessed => "manual_payment_processed",
            Self::PaymentSucceeded => "payment_succeeded",
            Self::PaymentFailed => "payment_failed",
            Self::PaymentRolledBack => "payment_rolled_back",
            Self::RollbackFailed => "rollback_failed",
            Self::RefundInitiated => "refund_initiated",
            Self::GatewayRefundCreated => "gateway_refund_created",
            Self::RefundCompleted => "refund_completed",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only record of a payment-relevant decision.
///
/// Entries are never updated or deleted; ordered by `recorded_at` they
/// reconstruct the full decision history of a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAuditEntry {
    pub payment_id: Uuid,
    pub action: AuditAction,
    pub detail: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl PaymentAuditEntry {
    pub fn new(payment_id: Uuid, action: AuditAction, detail: serde_json::Value) -> Self {
        Self {
            payment_id,
            action,
            detail,
            recorded_at: Utc::now(),
        }
    }
}
