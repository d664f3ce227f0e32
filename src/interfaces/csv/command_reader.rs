use crate::domain::payment::PaymentMethod;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of the command file. Columns that a given operation does not
/// use are left empty.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRecord {
    pub op: CommandOp,
    #[serde(default)]
    pub appointment: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub event: Option<EventField>,
    #[serde(default)]
    pub attempt: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandOp {
    /// Run one payment attempt against an appointment.
    Charge,
    /// Apply an asynchronous gateway event by charge reference.
    Event,
    /// Start a refund of the appointment's completed payment.
    Refund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventField {
    Succeeded,
    Failed,
    Refunded,
}

/// Reads commands from a CSV source.
///
/// Wraps `csv::Reader` and yields `Result<CommandRecord>` lazily, with
/// whitespace trimming and flexible record lengths, so large files stream
/// without loading everything up front.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<CommandRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

/// One row of the certificate seed file used to preload the store.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateSeedRecord {
    pub code: String,
    pub amount: Decimal,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub client: Option<String>,
}

/// Reads certificate seeds from a CSV source.
pub struct CertificateSeedReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CertificateSeedReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn seeds(self) -> impl Iterator<Item = Result<CertificateSeedRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
