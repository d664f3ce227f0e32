use crate::domain::audit::PaymentAuditEntry;
use crate::domain::certificate::{GiftCertificate, Redemption};
use crate::domain::payment::{Amount, CardDetails, Payment};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type CertificateStoreBox = Box<dyn CertificateStore>;
pub type AuditLogBox = Box<dyn AuditLog>;
pub type AppointmentDirectoryBox = Box<dyn AppointmentDirectory>;
pub type CardGatewayBox = Box<dyn CardGateway>;

/// Caller identity supplied by the external auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub tenant_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Staff,
}

/// Appointment data handed over by the scheduling collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub tenant_id: String,
    pub amount_due: Decimal,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts the payment, failing with `Conflict` when another payment
    /// for the same appointment still blocks new ones. The check and the
    /// insert must be one atomic step.
    async fn create(&self, payment: Payment) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn update(&self, payment: Payment) -> Result<()>;
    async fn find_by_external_ref(&self, reference: &str) -> Result<Option<Payment>>;
    async fn list_by_appointment(&self, appointment_id: &str) -> Result<Vec<Payment>>;
}

#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Inserts the certificate unless its code is already taken; returns
    /// whether the insert happened.
    async fn create(&self, certificate: GiftCertificate) -> Result<bool>;
    async fn get(&self, id: Uuid) -> Result<Option<GiftCertificate>>;
    /// Lookup by normalized code.
    async fn get_by_code(&self, code: &str) -> Result<Option<GiftCertificate>>;
    /// Atomic read-modify-write redemption. Implementations must serialize
    /// concurrent redeemers of the same certificate; the second caller
    /// observes the balance already reduced by the first.
    async fn redeem(&self, code: &str, requested: Amount, now: DateTime<Utc>)
    -> Result<Redemption>;
    async fn put(&self, certificate: GiftCertificate) -> Result<()>;
}

/// Append-only audit sink. There is deliberately no update or delete; the
/// interface is the guard against accidental mutation elsewhere.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: PaymentAuditEntry) -> Result<()>;
    async fn list_by_payment(&self, payment_id: Uuid) -> Result<Vec<PaymentAuditEntry>>;
}

#[async_trait]
pub trait AppointmentDirectory: Send + Sync {
    async fn find(&self, appointment_id: &str) -> Result<Option<Appointment>>;
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Local payment id, passed to the gateway as the idempotency key so a
    /// retried request cannot create two charges for one attempt.
    pub idempotency_key: Uuid,
    pub amount: Decimal,
    pub card: CardDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    Succeeded { reference: String },
    /// The charge exists but needs additional customer authentication; the
    /// reconciler finalizes the payment once the gateway confirms.
    RequiresAction { reference: String },
    Declined { code: String, message: String },
}

#[async_trait]
pub trait CardGateway: Send + Sync {
    fn name(&self) -> &'static str;
    async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeOutcome>;
    /// Requests a refund for a settled charge; returns the gateway's refund
    /// reference. Completion arrives later as a `ChargeRefunded` event.
    async fn create_refund(&self, reference: &str, amount: Decimal) -> Result<String>;
}
