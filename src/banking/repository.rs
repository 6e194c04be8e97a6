use crate::{
    BatchError,
    core::decider::RecordCounter,
    item::memory::InMemoryRepository,
};

use super::{BankingTransaction, TransactionStatus};

/// Store of banking transactions.
///
/// Also the transaction manager of both chunk steps of the banking job.
pub type InMemoryTransactionRepository = InMemoryRepository<BankingTransaction>;

impl InMemoryRepository<BankingTransaction> {
    pub fn find_by_status(
        &self,
        status: TransactionStatus,
    ) -> Result<Vec<BankingTransaction>, BatchError> {
        self.find_where(|transaction| transaction.status == status)
    }

    pub fn count_by_status(&self, status: TransactionStatus) -> Result<u64, BatchError> {
        self.count_where(|transaction| transaction.status == status)
    }
}

impl RecordCounter<TransactionStatus> for InMemoryRepository<BankingTransaction> {
    fn count_matching(&self, status: &TransactionStatus) -> Result<u64, BatchError> {
        self.count_by_status(*status)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn transaction(account: &str, status: TransactionStatus) -> BankingTransaction {
        BankingTransaction {
            id: None,
            account_number: account.to_string(),
            amount: 10.0,
            transaction_date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            status,
        }
    }

    #[test]
    fn counts_and_finds_by_status() {
        let repository = InMemoryTransactionRepository::new();
        repository
            .save_all(&[
                transaction("A", TransactionStatus::Pending),
                transaction("B", TransactionStatus::Processed),
                transaction("C", TransactionStatus::Pending),
            ])
            .unwrap();

        assert_eq!(repository.count_by_status(TransactionStatus::Pending).unwrap(), 2);
        assert_eq!(
            repository.count_matching(&TransactionStatus::Processed).unwrap(),
            1
        );

        let pending = repository.find_by_status(TransactionStatus::Pending).unwrap();
        let accounts: Vec<&str> = pending.iter().map(|t| t.account_number.as_str()).collect();
        assert_eq!(accounts, vec!["A", "C"]);
    }
}
