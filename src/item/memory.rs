//! In-memory transactional repository.
//!
//! [`InMemoryRepository`] stores entities keyed by a generated id. It is both
//! an [`ItemWriter`] and the [`TransactionManager`] of the steps writing to it:
//! writes made while a transaction is open are staged and only become visible
//! to queries on commit.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use log::debug;

use crate::{
    BatchError,
    core::{
        item::{ItemWriter, ItemWriterResult},
        transaction::TransactionManager,
    },
};

/// A record with an optional, repository-assigned identifier.
pub trait Entity: Clone {
    fn id(&self) -> Option<i64>;
    fn assign_id(&mut self, id: i64);
}

struct RepositoryState<T> {
    rows: BTreeMap<i64, T>,
    staged: Option<Vec<T>>,
    next_id: i64,
}

impl<T: Entity> RepositoryState<T> {
    fn apply(&mut self, items: Vec<T>) {
        for mut item in items {
            let id = match item.id() {
                Some(id) => {
                    self.next_id = self.next_id.max(id.saturating_add(1));
                    id
                }
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    item.assign_id(id);
                    id
                }
            };
            self.rows.insert(id, item);
        }
    }
}

pub struct InMemoryRepository<T> {
    state: Mutex<RepositoryState<T>>,
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RepositoryState {
                rows: BTreeMap::new(),
                staged: None,
                next_id: 1,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RepositoryState<T>>, BatchError> {
        self.state
            .lock()
            .map_err(|_| BatchError::Transaction("repository lock poisoned".to_string()))
    }

    /// Inserts items without an id and updates the others.
    ///
    /// Inside a transaction the items are staged until commit.
    pub fn save_all(&self, items: &[T]) -> Result<(), BatchError> {
        let mut state = self.lock()?;
        match state.staged.as_mut() {
            Some(staged) => staged.extend_from_slice(items),
            None => state.apply(items.to_vec()),
        }
        Ok(())
    }

    /// Committed rows, ordered by id.
    pub fn find_all(&self) -> Result<Vec<T>, BatchError> {
        Ok(self.lock()?.rows.values().cloned().collect())
    }

    pub fn find_where(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>, BatchError> {
        Ok(self
            .lock()?
            .rows
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect())
    }

    pub fn count_where(&self, predicate: impl Fn(&T) -> bool) -> Result<u64, BatchError> {
        Ok(self.lock()?.rows.values().filter(|row| predicate(row)).count() as u64)
    }

    pub fn count(&self) -> Result<u64, BatchError> {
        Ok(self.lock()?.rows.len() as u64)
    }

    pub fn in_transaction(&self) -> Result<bool, BatchError> {
        Ok(self.lock()?.staged.is_some())
    }
}

impl<T: Entity> TransactionManager for InMemoryRepository<T> {
    fn begin(&self) -> Result<(), BatchError> {
        let mut state = self.lock()?;
        if state.staged.is_some() {
            return Err(BatchError::Transaction(
                "a transaction is already active on this repository".to_string(),
            ));
        }
        state.staged = Some(Vec::new());
        Ok(())
    }

    fn commit(&self) -> Result<(), BatchError> {
        let mut state = self.lock()?;
        let staged = state
            .staged
            .take()
            .ok_or_else(|| BatchError::Transaction("no active transaction".to_string()))?;
        debug!("Committing {} staged rows", staged.len());
        state.apply(staged);
        Ok(())
    }

    fn rollback(&self) -> Result<(), BatchError> {
        if let Some(staged) = self.lock()?.staged.take() {
            debug!("Discarding {} staged rows", staged.len());
        }
        Ok(())
    }
}

impl<T: Entity> ItemWriter<T> for InMemoryRepository<T> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        self.save_all(items)
    }
}
