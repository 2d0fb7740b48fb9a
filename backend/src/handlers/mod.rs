//! HTTP request handlers

pub mod appointments;
pub mod health;
pub mod notifications;
pub mod patients;
pub mod stock;
pub mod supplies;
pub mod transactions;

pub use appointments::*;
pub use health::*;
pub use notifications::*;
pub use patients::*;
pub use stock::*;
pub use supplies::*;
pub use transactions::*;
