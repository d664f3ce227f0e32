//! Driving adapters. Only the CSV command interface lives here.

pub mod csv;
