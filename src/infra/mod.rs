//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod rules;
pub mod telemetry;
