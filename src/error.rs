use crate::domain::payment::PaymentStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Engine-wide error taxonomy.
///
/// Validation, not-found, conflict and unauthorized errors are always raised
/// before any state is written. Certificate errors and gateway errors occur
/// mid-flight and are paired with a rollback by the orchestrator.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("gift certificate not found: {0}")]
    CertificateNotFound(String),
    #[error("gift certificate expired: {0}")]
    CertificateExpired(String),
    #[error("gift certificate has no remaining balance: {0}")]
    CertificateExhausted(String),
    #[error("could not allocate a unique certificate code")]
    CodeAllocation,
    #[error("retry limit reached at attempt {attempt} (maximum {max}); the payment cannot be retried")]
    RetryExhausted { attempt: u32, max: u32 },
    #[error("illegal payment status transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("gateway error: {0}")]
    Gateway(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
