//! Business logic services for the clinic operations backend

pub mod appointment;
pub mod notification;
pub mod patient;
pub mod stock_ledger;
pub mod stock_report;
pub mod supply;
pub mod supply_transaction;

pub use appointment::AppointmentService;
pub use notification::NotificationService;
pub use patient::PatientService;
pub use stock_ledger::{StockLedgerService, StockMovement};
pub use stock_report::StockReportService;
pub use supply::SupplyService;
pub use supply_transaction::SupplyTransactionService;
