//! Banking transaction job.
//!
//! Transactions are imported from CSV rows into an in-memory repository, then
//! a decider checks whether any of them is still pending. Pending transactions
//! are marked as processed; when there are none, a logging step ends the job.
//!
//! ```text
//! importTransactionStep -> pendingTransactionDecider
//!     PROCESS    -> processTransactionStep
//!     NO_PENDING -> noTransactionStep
//! ```

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::item::memory::Entity;

pub mod job;
pub mod listener;
pub mod processor;
pub mod reader;
pub mod repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Processed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

/// A stored banking transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankingTransaction {
    pub id: Option<i64>,
    pub account_number: String,
    pub amount: f64,
    pub transaction_date: NaiveDate,
    pub status: TransactionStatus,
}

impl Entity for BankingTransaction {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

/// One row of a transactions CSV file: `accountNumber,amount,transactionDate`.
///
/// Dates use the `%Y-%m-%d` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub account_number: String,
    pub amount: f64,
    pub transaction_date: NaiveDate,
}
