//! Application layer: the orchestrating services that tie the domain model
//! to the storage ports. Each payment operation is a short-lived unit of
//! work; there are no background loops in here. Retries are caller-driven
//! and reconciliation is driven by the gateway's own delivery.

pub mod ledger;
pub mod orchestrator;
pub mod reconciler;
