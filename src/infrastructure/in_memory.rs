use crate::domain::audit::PaymentAuditEntry;
use crate::domain::certificate::{GiftCertificate, Redemption};
use crate::domain::payment::{Amount, Payment};
use crate::domain::ports::{
    Appointment, AppointmentDirectory, AuditLog, CertificateStore, PaymentStore,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory payment store.
///
/// The conflict check and the insert run under one write lock, which is
/// what makes concurrent submissions for the same appointment resolve to
/// exactly one created payment.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<Uuid, Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        let blocked = payments
            .values()
            .any(|p| p.appointment_id == payment.appointment_id && p.blocks_new_payment());
        if blocked {
            return Err(PaymentError::Conflict(format!(
                "appointment {} already has a payment",
                payment.appointment_id
            )));
        }
        payments.insert(payment.id, payment);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.get(&id).cloned())
    }

    async fn update(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        if !payments.contains_key(&payment.id) {
            return Err(PaymentError::NotFound(format!("payment {}", payment.id)));
        }
        payments.insert(payment.id, payment);
        Ok(())
    }

    async fn find_by_external_ref(&self, reference: &str) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .find(|p| p.external_ref.as_deref() == Some(reference))
            .cloned())
    }

    async fn list_by_appointment(&self, appointment_id: &str) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        let mut matched: Vec<Payment> = payments
            .values()
            .filter(|p| p.appointment_id == appointment_id)
            .cloned()
            .collect();
        matched.sort_by_key(|p| p.created_at);
        Ok(matched)
    }
}

/// Thread-safe in-memory certificate store.
///
/// `redeem` runs the whole read-validate-decrement-write sequence under
/// the write lock: concurrent redeemers of the same certificate serialize,
/// and the second one sees the already-reduced balance.
#[derive(Default, Clone)]
pub struct InMemoryCertificateStore {
    certificates: Arc<RwLock<HashMap<Uuid, GiftCertificate>>>,
}

impl InMemoryCertificateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CertificateStore for InMemoryCertificateStore {
    async fn create(&self, certificate: GiftCertificate) -> Result<bool> {
        let mut certificates = self.certificates.write().await;
        if certificates.values().any(|c| c.code == certificate.code) {
            return Ok(false);
        }
        certificates.insert(certificate.id, certificate);
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> Result<Option<GiftCertificate>> {
        let certificates = self.certificates.read().await;
        Ok(certificates.get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<GiftCertificate>> {
        let certificates = self.certificates.read().await;
        Ok(certificates.values().find(|c| c.code == code).cloned())
    }

    async fn redeem(
        &self,
        code: &str,
        requested: Amount,
        now: DateTime<Utc>,
    ) -> Result<Redemption> {
        let mut certificates = self.certificates.write().await;
        let certificate = certificates
            .values_mut()
            .find(|c| c.code == code)
            .ok_or_else(|| PaymentError::CertificateNotFound(code.to_string()))?;
        certificate.redeem(requested, now)
    }

    async fn put(&self, certificate: GiftCertificate) -> Result<()> {
        let mut certificates = self.certificates.write().await;
        certificates.insert(certificate.id, certificate);
        Ok(())
    }
}

/// Append-only in-memory audit log. The backing `Vec` only ever grows;
/// nothing in the interface can touch an existing entry.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<PaymentAuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: PaymentAuditEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn list_by_payment(&self, payment_id: Uuid) -> Result<Vec<PaymentAuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.payment_id == payment_id)
            .cloned()
            .collect())
    }
}

/// Stand-in for the external scheduling collaborator.
#[derive(Default, Clone)]
pub struct InMemoryAppointmentDirectory {
    appointments: Arc<RwLock<HashMap<String, Appointment>>>,
}

impl InMemoryAppointmentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, appointment: Appointment) {
        let mut appointments = self.appointments.write().await;
        appointments.insert(appointment.id.clone(), appointment);
    }
}

#[async_trait]
impl AppointmentDirectory for InMemoryAppointmentDirectory {
    async fn find(&self, appointment_id: &str) -> Result<Option<Appointment>> {
        let appointments = self.appointments.read().await;
        Ok(appointments.get(appointment_id).cloned())
    }
}
