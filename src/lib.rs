//! Payment settlement and gift-certificate ledger engine.
//!
//! The crate is organized hexagonally: `domain` holds the payment and
//! certificate models plus the port traits, `application` holds the
//! orchestrating services, `processors` the per-source charging strategies,
//! `infrastructure` the storage and gateway adapters, and `interfaces` the
//! CSV command driver used by the binary.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod processors;
