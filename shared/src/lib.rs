//! Shared types and models for the clinic operations platform
//!
//! This crate holds the domain rules shared between the backend server and
//! the browser helpers (via WASM): the stock ledger arithmetic, the supply
//! transaction approval workflow, report aggregation and the patient record
//! default policy. Nothing in here performs I/O.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
