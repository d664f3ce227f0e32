use crate::domain::certificate::{
    BalanceReport, GiftCertificate, Redemption, generate_code, normalize_code,
};
use crate::domain::payment::Amount;
use crate::domain::ports::{Actor, CertificateStoreBox, Role};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Owns certificate code allocation, balance reads and atomic redemption.
pub struct CertificateLedger {
    certificates: CertificateStoreBox,
    max_code_attempts: u32,
}

pub struct IssueRequest {
    pub tenant_id: String,
    pub original_amount: Decimal,
    pub client_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CertificateLedger {
    pub fn new(certificates: CertificateStoreBox, max_code_attempts: u32) -> Self {
        Self {
            certificates,
            max_code_attempts,
        }
    }

    /// Creates a certificate with a freshly generated code, retrying a
    /// bounded number of times on code collision.
    pub async fn issue(&self, request: IssueRequest) -> Result<GiftCertificate> {
        let original = Amount::new(request.original_amount)?;

        for _ in 0..self.max_code_attempts {
            // ThreadRng is not Send; keep it out of scope across the await.
            let code = {
                let mut rng = rand::thread_rng();
                generate_code(&mut rng)
            };
            let certificate = GiftCertificate::new(
                code,
                original,
                request.tenant_id.clone(),
                request.client_id.clone(),
                request.expires_at,
            );
            if self.certificates.create(certificate.clone()).await? {
                tracing::info!(
                    certificate_id = %certificate.id,
                    code = %certificate.code,
                    amount = %certificate.original_amount,
                    "issued gift certificate"
                );
                return Ok(certificate);
            }
        }

        Err(PaymentError::CodeAllocation)
    }

    /// Atomically applies up to `requested` from the certificate balance.
    /// Serialization of concurrent redeemers is the store's contract;
    /// failures surface verbatim.
    pub async fn redeem(&self, code: &str, requested: Amount) -> Result<Redemption> {
        let normalized = normalize_code(code);
        let redemption = self
            .certificates
            .redeem(&normalized, requested, Utc::now())
            .await?;
        tracing::info!(
            code = %normalized,
            applied = %redemption.amount_applied,
            remaining = %redemption.remaining_balance,
            "redeemed gift certificate"
        );
        Ok(redemption)
    }

    /// Read-only balance lookup with an expired/exhausted classification
    /// for display.
    pub async fn check_balance(&self, code: &str) -> Result<BalanceReport> {
        let normalized = normalize_code(code);
        let certificate = self
            .certificates
            .get_by_code(&normalized)
            .await?
            .ok_or_else(|| PaymentError::CertificateNotFound(normalized.clone()))?;
        Ok(BalanceReport {
            code: certificate.code.clone(),
            balance: certificate.balance,
            original_amount: certificate.original_amount,
            state: certificate.state(Utc::now()),
        })
    }

    /// Forces the balance to zero. Owner-role only, and irreversible.
    pub async fn void(&self, certificate_id: Uuid, actor: &Actor) -> Result<GiftCertificate> {
        if actor.role != Role::Owner {
            return Err(PaymentError::Unauthorized(
                "voiding a certificate requires the owner role".to_string(),
            ));
        }
        let mut certificate = self
            .certificates
            .get(certificate_id)
            .await?
            .ok_or_else(|| PaymentError::CertificateNotFound(certificate_id.to_string()))?;
        if certificate.tenant_id != actor.tenant_id {
            return Err(PaymentError::Unauthorized(
                "certificate belongs to another tenant".to_string(),
            ));
        }

        certificate.void();
        self.certificates.put(certificate.clone()).await?;
        tracing::warn!(
            certificate_id = %certificate.id,
            code = %certificate.code,
            by = %actor.user_id,
            "gift certificate voided"
        );
        Ok(certificate)
    }
}
