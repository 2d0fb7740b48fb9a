//! Supply transactions: the audit trail of stock movements and their approval

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    In,
    Out,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "in",
            TransactionType::Out => "out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(TransactionType::In),
            "out" => Some(TransactionType::Out),
            _ => None,
        }
    }

    /// Ledger delta for a positive quantity moving in this direction
    pub fn signed_quantity(&self, quantity: i32) -> i32 {
        match self {
            TransactionType::In => quantity,
            TransactionType::Out => -quantity,
        }
    }
}

/// Reason for a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSubtype {
    Received,
    Returned,
    Adjustment,
    Consumed,
    Rejected,
    Expired,
    Damaged,
    Transferred,
}

impl TransactionSubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionSubtype::Received => "received",
            TransactionSubtype::Returned => "returned",
            TransactionSubtype::Adjustment => "adjustment",
            TransactionSubtype::Consumed => "consumed",
            TransactionSubtype::Rejected => "rejected",
            TransactionSubtype::Expired => "expired",
            TransactionSubtype::Damaged => "damaged",
            TransactionSubtype::Transferred => "transferred",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(TransactionSubtype::Received),
            "returned" => Some(TransactionSubtype::Returned),
            "adjustment" => Some(TransactionSubtype::Adjustment),
            "consumed" => Some(TransactionSubtype::Consumed),
            "rejected" => Some(TransactionSubtype::Rejected),
            "expired" => Some(TransactionSubtype::Expired),
            "damaged" => Some(TransactionSubtype::Damaged),
            "transferred" => Some(TransactionSubtype::Transferred),
            _ => None,
        }
    }

    /// Whether this subtype makes sense for the given direction
    pub fn allowed_for(&self, transaction_type: TransactionType) -> bool {
        match self {
            TransactionSubtype::Adjustment => true,
            TransactionSubtype::Received | TransactionSubtype::Returned => {
                transaction_type == TransactionType::In
            }
            TransactionSubtype::Consumed
            | TransactionSubtype::Rejected
            | TransactionSubtype::Expired
            | TransactionSubtype::Damaged
            | TransactionSubtype::Transferred => transaction_type == TransactionType::Out,
        }
    }
}

/// Approval state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApprovalStatus::Pending),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the approval workflow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("Transaction is already {0}")]
    AlreadyDecided(ApprovalStatus),

    #[error("A rejection reason is required")]
    MissingReason,
}

/// A recorded stock movement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplyTransaction {
    pub id: i64,
    pub supply_id: i64,
    pub stock_level_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub subtype: TransactionSubtype,
    pub quantity: i32,
    pub unit_cost: Option<Decimal>,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub recorded_by: i64,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupplyTransaction {
    /// Signed quantity this transaction applies to the stock ledger
    pub fn signed_delta(&self) -> i32 {
        self.transaction_type.signed_quantity(self.quantity)
    }

    /// pending -> approved
    pub fn approve(&mut self, approver_id: i64, now: DateTime<Utc>) -> Result<(), ApprovalError> {
        self.ensure_pending()?;
        self.approval_status = ApprovalStatus::Approved;
        self.approved_by = Some(approver_id);
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// pending -> rejected, appending the reason to the notes
    pub fn reject(
        &mut self,
        approver_id: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApprovalError> {
        self.ensure_pending()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApprovalError::MissingReason);
        }

        self.approval_status = ApprovalStatus::Rejected;
        self.approved_by = Some(approver_id);
        self.approved_at = Some(now);
        self.notes = Some(append_rejection_note(self.notes.as_deref(), reason));
        self.updated_at = now;
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), ApprovalError> {
        if self.approval_status.is_terminal() {
            return Err(ApprovalError::AlreadyDecided(self.approval_status));
        }
        Ok(())
    }
}

/// Notes after a rejection: existing text is kept, the reason goes on a new line
pub fn append_rejection_note(notes: Option<&str>, reason: &str) -> String {
    match notes.map(str::trim_end).filter(|n| !n.is_empty()) {
        Some(existing) => format!("{}\nRejected: {}", existing, reason),
        None => format!("Rejected: {}", reason),
    }
}
