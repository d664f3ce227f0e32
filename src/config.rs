use rust_decimal::Decimal;
use std::time::Duration;

/// Tunables for the settlement engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of payment attempts per appointment. Retries are
    /// caller-driven; an attempt at or past this bound is rejected outright.
    pub max_retries: u32,
    /// How many certificate codes to generate before giving up on a
    /// collision-free one.
    pub max_code_attempts: u32,
    /// Smallest amount the card gateway will accept.
    pub card_minimum: Decimal,
    /// Upper bound on a single gateway charge call. A timed-out charge is
    /// treated as a failure; the gateway webhook is the backstop if the
    /// charge actually went through.
    pub gateway_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            max_code_attempts: 10,
            card_minimum: Decimal::new(50, 2),
            gateway_timeout: Duration::from_secs(10),
        }
    }
}
