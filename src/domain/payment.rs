use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A positive monetary amount.
///
/// Wrapper around `rust_decimal::Decimal` so that request amounts are
/// validated once, at the boundary, instead of re-checked everywhere.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::Validation(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    GiftCertificate,
    Card,
    Cash,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GiftCertificate => "gift_certificate",
            Self::Card => "card",
            Self::Cash => "cash",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// The one-directional payment state machine. Both writers (the
    /// orchestrator and the reconciler) consult this before applying a
    /// transition, which is what makes out-of-order gateway events safe.
    pub fn can_transition(self, to: PaymentStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Completed, Self::Refunded)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: u8,
    pub exp_year: u16,
    pub name: String,
}

/// The payment source selected by the caller, with per-variant details.
///
/// A closed tagged union: adding a source is a compile-time-checked change
/// in the orchestrator's dispatch, not an untyped branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentSource {
    GiftCertificate { code: String },
    Card(CardDetails),
    Cash { note: Option<String> },
    Other { note: Option<String> },
}

impl PaymentSource {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::GiftCertificate { .. } => PaymentMethod::GiftCertificate,
            Self::Card(_) => PaymentMethod::Card,
            Self::Cash { .. } => PaymentMethod::Cash,
            Self::Other { .. } => PaymentMethod::Other,
        }
    }
}

/// One payment attempt against an appointment.
///
/// Created `Pending` by the orchestrator and mutated only through the
/// checked transition methods below, by the orchestrator (its own attempt)
/// or the reconciler (gateway events). Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub appointment_id: String,
    pub tenant_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Gateway charge reference; set once a card charge has been created.
    pub external_ref: Option<String>,
    /// The amount the source actually covered. May be less than `amount`
    /// for a partially-funded gift certificate.
    pub amount_applied: Option<Decimal>,
    pub retry_attempt: u32,
    pub processor: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        appointment_id: impl Into<String>,
        tenant_id: impl Into<String>,
        amount: Amount,
        method: PaymentMethod,
        retry_attempt: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            appointment_id: appointment_id.into(),
            tenant_id: tenant_id.into(),
            amount: amount.value(),
            method,
            status: PaymentStatus::Pending,
            external_ref: None,
            amount_applied: None,
            retry_attempt,
            processor: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, to: PaymentStatus) -> Result<()> {
        if !self.status.can_transition(to) {
            return Err(PaymentError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self, amount_applied: Decimal) -> Result<()> {
        self.transition(PaymentStatus::Completed)?;
        self.amount_applied = Some(amount_applied);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(PaymentStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn refund(&mut self) -> Result<()> {
        self.transition(PaymentStatus::Refunded)
    }

    /// Whether this payment prevents a new payment for the same appointment.
    ///
    /// In-flight payments block. A completed (or refunded) payment blocks
    /// only when it covered its full amount; partial coverage leaves the
    /// remainder open for a second payment via another source. Failed
    /// payments are superseded by the caller's retry and never block.
    pub fn blocks_new_payment(&self) -> bool {
        match self.status {
            PaymentStatus::Pending => true,
            PaymentStatus::Completed | PaymentStatus::Refunded => {
                self.amount_applied.is_some_and(|applied| applied >= self.amount)
            }
            PaymentStatus::Failed => false,
        }
    }
}
