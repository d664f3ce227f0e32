use crate::domain::audit::PaymentAuditEntry;
use crate::domain::certificate::{GiftCertificate, Redemption};
use crate::domain::payment::{Amount, Payment};
use crate::domain::ports::{AuditLog, CertificateStore, PaymentStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column family for payment rows.
pub const CF_PAYMENTS: &str = "payments";
/// Column family for gift certificates, keyed by normalized code.
pub const CF_CERTIFICATES: &str = "certificates";
/// Column family for audit entries, keyed `"{payment_id}:{nanos}:{uuid}"`
/// so a prefix scan returns one payment's history in recorded order.
pub const CF_AUDIT: &str = "audit";

/// Persistent store backed by RocksDB.
///
/// `Clone` shares the underlying handle. The write mutex serializes the
/// read-modify-write sequences (certificate redemption, payment creation)
/// that the in-memory store covers with its own lock.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

fn storage_err(e: impl std::fmt::Display) -> PaymentError {
    PaymentError::Storage(e.to_string())
}

impl RocksDbStore {
    /// Opens or creates the database, ensuring all column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_CERTIFICATES, Options::default()),
            ColumnFamilyDescriptor::new(CF_AUDIT, Options::default()),
        ];
        let db = DB::open_cf_descriptors(&opts, path, cfs).map_err(storage_err)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::Storage(format!("column family {name} not found")))
    }

    fn put_json<T: serde::Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let handle = self.cf(cf)?;
        let bytes = serde_json::to_vec(value).map_err(storage_err)?;
        self.db.put_cf(handle, key, bytes).map_err(storage_err)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let handle = self.cf(cf)?;
        match self.db.get_cf(handle, key).map_err(storage_err)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(storage_err)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: serde::de::DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let handle = self.cf(cf)?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(handle, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(storage_err)?;
            items.push(serde_json::from_slice(&value).map_err(storage_err)?);
        }
        Ok(items)
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn create(&self, payment: Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let existing: Vec<Payment> = self.scan_json(CF_PAYMENTS)?;
        if existing
            .iter()
            .any(|p| p.appointment_id == payment.appointment_id && p.blocks_new_payment())
        {
            return Err(PaymentError::Conflict(format!(
                "appointment {} already has a payment",
                payment.appointment_id
            )));
        }
        self.put_json(CF_PAYMENTS, payment.id.as_bytes(), &payment)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>> {
        self.get_json(CF_PAYMENTS, id.as_bytes())
    }

    async fn update(&self, payment: Payment) -> Result<()> {
        let handle = self.cf(CF_PAYMENTS)?;
        let exists = self
            .db
            .get_pinned_cf(handle, payment.id.as_bytes())
            .map_err(storage_err)?
            .is_some();
        if !exists {
            return Err(PaymentError::NotFound(format!("payment {}", payment.id)));
        }
        self.put_json(CF_PAYMENTS, payment.id.as_bytes(), &payment)
    }

    async fn find_by_external_ref(&self, reference: &str) -> Result<Option<Payment>> {
        let payments: Vec<Payment> = self.scan_json(CF_PAYMENTS)?;
        Ok(payments
            .into_iter()
            .find(|p| p.external_ref.as_deref() == Some(reference)))
    }

    async fn list_by_appointment(&self, appointment_id: &str) -> Result<Vec<Payment>> {
        let payments: Vec<Payment> = self.scan_json(CF_PAYMENTS)?;
        let mut matched: Vec<Payment> = payments
            .into_iter()
            .filter(|p| p.appointment_id == appointment_id)
            .collect();
        matched.sort_by_key(|p| p.created_at);
        Ok(matched)
    }
}

#[async_trait]
impl CertificateStore for RocksDbStore {
    async fn create(&self, certificate: GiftCertificate) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let existing: Option<GiftCertificate> =
            self.get_json(CF_CERTIFICATES, certificate.code.as_bytes())?;
        if existing.is_some() {
            return Ok(false);
        }
        self.put_json(CF_CERTIFICATES, certificate.code.as_bytes(), &certificate)?;
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> Result<Option<GiftCertificate>> {
        let certificates: Vec<GiftCertificate> = self.scan_json(CF_CERTIFICATES)?;
        Ok(certificates.into_iter().find(|c| c.id == id))
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<GiftCertificate>> {
        self.get_json(CF_CERTIFICATES, code.as_bytes())
    }

    async fn redeem(
        &self,
        code: &str,
        requested: Amount,
        now: DateTime<Utc>,
    ) -> Result<Redemption> {
        // Same serialization contract as the in-memory store: the whole
        // read-validate-decrement-write runs under one lock.
        let _guard = self.write_lock.lock().await;
        let mut certificate: GiftCertificate = self
            .get_json(CF_CERTIFICATES, code.as_bytes())?
            .ok_or_else(|| PaymentError::CertificateNotFound(code.to_string()))?;
        let redemption = certificate.redeem(requested, now)?;
        self.put_json(CF_CERTIFICATES, code.as_bytes(), &certificate)?;
        Ok(redemption)
    }

    async fn put(&self, certificate: GiftCertificate) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.put_json(CF_CERTIFICATES, certificate.code.as_bytes(), &certificate)
    }
}

#[async_trait]
impl AuditLog for RocksDbStore {
    async fn append(&self, entry: PaymentAuditEntry) -> Result<()> {
        let nanos = entry.recorded_at.timestamp_nanos_opt().unwrap_or(0);
        let key = format!("{}:{:020}:{}", entry.payment_id, nanos, Uuid::new_v4());
        self.put_json(CF_AUDIT, key.as_bytes(), &entry)
    }

    async fn list_by_payment(&self, payment_id: Uuid) -> Result<Vec<PaymentAuditEntry>> {
        let handle = self.cf(CF_AUDIT)?;
        let prefix = format!("{payment_id}:");
        let mode = rocksdb::IteratorMode::From(prefix.as_bytes(), rocksdb::Direction::Forward);
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(handle, mode) {
            let (key, value) = item.map_err(storage_err)?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            entries.push(serde_json::from_slice(&value).map_err(storage_err)?);
        }
        Ok(entries)
    }
}
