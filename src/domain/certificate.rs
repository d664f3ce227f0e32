use crate::domain::payment::Amount;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Code alphabet: 32 symbols, excludes 0/O, 1/I and similar ambiguous
/// glyphs so codes survive being read over the phone.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const CODE_GROUPS: usize = 3;
const GROUP_LEN: usize = 4;

/// Generates a `XXXX-XXXX-XXXX` code from the unambiguous alphabet.
///
/// Collision handling is the caller's job: the ledger retries a bounded
/// number of times against the store's uniqueness check.
pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    let mut groups = Vec::with_capacity(CODE_GROUPS);
    for _ in 0..CODE_GROUPS {
        let group: String = (0..GROUP_LEN)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        groups.push(group);
    }
    groups.join("-")
}

/// Normalizes human-entered codes for lookup: strips whitespace and
/// hyphens, uppercases, and re-hyphenates when the result has the expected
/// length. Inputs of any other shape are returned cleaned but unhyphenated,
/// which simply fails the lookup.
pub fn normalize_code(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.len() != CODE_GROUPS * GROUP_LEN {
        return cleaned;
    }
    cleaned
        .as_bytes()
        .chunks(GROUP_LEN)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("-")
}

/// Applied/remaining pair returned by a redemption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    pub amount_applied: Decimal,
    pub remaining_balance: Decimal,
}

/// Display classification for a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateState {
    Active,
    Expired,
    Exhausted,
}

/// Read-only balance summary.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReport {
    pub code: String,
    pub balance: Decimal,
    pub original_amount: Decimal,
    pub state: CertificateState,
}

/// A stored-value gift certificate.
///
/// The balance never increases; it only shrinks through `redeem` or is
/// forced to zero by an administrative void.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftCertificate {
    pub id: Uuid,
    pub code: String,
    pub balance: Decimal,
    pub original_amount: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
    pub client_id: Option<String>,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
}

impl GiftCertificate {
    pub fn new(
        code: String,
        original_amount: Amount,
        tenant_id: impl Into<String>,
        client_id: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            balance: original_amount.value(),
            original_amount: original_amount.value(),
            expires_at,
            client_id,
            tenant_id: tenant_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn state(&self, now: DateTime<Utc>) -> CertificateState {
        if self.is_expired(now) {
            CertificateState::Expired
        } else if self.balance <= Decimal::ZERO {
            CertificateState::Exhausted
        } else {
            CertificateState::Active
        }
    }

    /// The core redemption rule: validate, apply `min(requested, balance)`,
    /// decrement. Callers must run this inside whatever lock the backing
    /// store uses to serialize redeemers of the same certificate.
    pub fn redeem(&mut self, requested: Amount, now: DateTime<Utc>) -> Result<Redemption> {
        if self.is_expired(now) {
            return Err(PaymentError::CertificateExpired(self.code.clone()));
        }
        if self.balance <= Decimal::ZERO {
            return Err(PaymentError::CertificateExhausted(self.code.clone()));
        }
        let applied = requested.value().min(self.balance);
        self.balance -= applied;
        Ok(Redemption {
            amount_applied: applied,
            remaining_balance: self.balance,
        })
    }

    /// Administrative void: balance forced to zero, irreversibly.
    pub fn void(&mut self) {
        self.balance = Decimal::ZERO;
    }
}
