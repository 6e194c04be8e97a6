use log::debug;

use crate::core::item::{ItemProcessor, ItemProcessorResult};

use super::{BankingTransaction, TransactionRecord, TransactionStatus};

/// Turns an imported CSV row into a pending transaction.
///
/// Rows with a negative amount are filtered out.
#[derive(Default)]
pub struct TransactionImportProcessor;

impl ItemProcessor<TransactionRecord, BankingTransaction> for TransactionImportProcessor {
    fn process(&self, record: &TransactionRecord) -> ItemProcessorResult<BankingTransaction> {
        if record.amount < 0.0 {
            debug!(
                "Skipping transaction of account {} with negative amount {}",
                record.account_number, record.amount
            );
            return Ok(None);
        }

        Ok(Some(BankingTransaction {
            id: None,
            account_number: record.account_number.clone(),
            amount: record.amount,
            transaction_date: record.transaction_date,
            status: TransactionStatus::Pending,
        }))
    }
}

#[derive(Default)]
pub struct MarkProcessedProcessor;

impl ItemProcessor<BankingTransaction, BankingTransaction> for MarkProcessedProcessor {
    fn process(&self, transaction: &BankingTransaction) -> ItemProcessorResult<BankingTransaction> {
        Ok(Some(BankingTransaction {
            status: TransactionStatus::Processed,
            ..transaction.clone()
        }))
    }
}
