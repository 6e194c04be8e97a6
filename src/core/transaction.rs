//! Transaction boundaries for chunk and tasklet steps.
//!
//! A [`TransactionManager`] is the resource a step commits against. Steps never
//! call it directly: they open a [`Transaction`] scope, which commits only when
//! asked to and rolls back on every other exit path, including early returns
//! through `?`.

use log::{debug, warn};

use crate::BatchError;

/// Resource that can group writes into atomic units.
///
/// Implementations hold the writes made between `begin` and `commit` so that a
/// `rollback` discards them entirely.
pub trait TransactionManager {
    fn begin(&self) -> Result<(), BatchError>;
    fn commit(&self) -> Result<(), BatchError>;
    fn rollback(&self) -> Result<(), BatchError>;
}

/// Transaction manager for steps whose resources are not transactional.
#[derive(Default, Debug, Clone, Copy)]
pub struct ResourcelessTransactionManager;

impl TransactionManager for ResourcelessTransactionManager {
    fn begin(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn commit(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Scoped transaction: rolled back on drop unless [`Transaction::commit`] succeeded.
pub struct Transaction<'a> {
    manager: &'a dyn TransactionManager,
    completed: bool,
}

impl<'a> Transaction<'a> {
    pub fn begin(manager: &'a dyn TransactionManager) -> Result<Self, BatchError> {
        manager.begin()?;
        debug!("Transaction started");
        Ok(Self {
            manager,
            completed: false,
        })
    }

    /// Commits the transaction. A failed commit is rolled back before the error is returned.
    pub fn commit(mut self) -> Result<(), BatchError> {
        self.completed = true;
        if let Err(error) = self.manager.commit() {
            if let Err(rollback_error) = self.manager.rollback() {
                warn!("Rollback after failed commit failed: {}", rollback_error);
            }
            return Err(error);
        }
        debug!("Transaction committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), BatchError> {
        self.completed = true;
        debug!("Transaction rolled back");
        self.manager.rollback()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.completed {
            debug!("Transaction rolled back on scope exit");
            if let Err(error) = self.manager.rollback() {
                warn!("Rollback failed: {}", error);
            }
        }
    }
}
