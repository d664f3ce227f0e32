//! Domain model: entities, value objects, state machines and the storage
//! and collaborator ports they are persisted and resolved through.

pub mod audit;
pub mod certificate;
pub mod payment;
pub mod ports;
