use std::{cell::RefCell, collections::VecDeque};

use log::debug;

use crate::core::item::{ItemReader, ItemReaderResult};

use super::{BankingTransaction, TransactionStatus, repository::InMemoryTransactionRepository};

/// Reads the transactions having a given status.
///
/// The matching rows are loaded on the first `read` and then handed out one by
/// one, so updates written by the step do not change what is read. Once the
/// end of data has been reported, the next `read` loads a fresh snapshot.
pub struct PendingTransactionReader<'a> {
    repository: &'a InMemoryTransactionRepository,
    status: TransactionStatus,
    snapshot: RefCell<Option<VecDeque<BankingTransaction>>>,
}

impl<'a> PendingTransactionReader<'a> {
    pub fn new(repository: &'a InMemoryTransactionRepository) -> Self {
        Self::with_status(repository, TransactionStatus::Pending)
    }

    pub fn with_status(
        repository: &'a InMemoryTransactionRepository,
        status: TransactionStatus,
    ) -> Self {
        Self {
            repository,
            status,
            snapshot: RefCell::new(None),
        }
    }
}

impl ItemReader<BankingTransaction> for PendingTransactionReader<'_> {
    fn read(&self) -> ItemReaderResult<BankingTransaction> {
        let mut snapshot = self.snapshot.borrow_mut();

        if snapshot.is_none() {
            let rows = self.repository.find_by_status(self.status)?;
            debug!("Loaded {} {} transactions", rows.len(), self.status);
            *snapshot = Some(rows.into());
        }

        let next = snapshot.as_mut().and_then(VecDeque::pop_front);
        if next.is_none() {
            *snapshot = None;
        }
        Ok(next)
    }
}
