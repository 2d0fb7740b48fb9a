//! Domain models for the clinic operations platform

mod appointment;
mod notification;
mod patient;
mod reports;
mod stock_level;
mod supply;
mod supply_transaction;

pub use appointment::*;
pub use notification::*;
pub use patient::*;
pub use reports::*;
pub use stock_level::*;
pub use supply::*;
pub use supply_transaction::*;
