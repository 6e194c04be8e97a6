use crate::item::memory::InMemoryRepository;

use super::{LogEntry, LogSummary};

/// Imported log entries and the summaries computed from them.
///
/// Entries and summaries live in separate repositories, each one being the
/// transaction manager of the step that writes to it.
#[derive(Default)]
pub struct InMemoryLogStore {
    entries: InMemoryRepository<LogEntry>,
    summaries: InMemoryRepository<LogSummary>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &InMemoryRepository<LogEntry> {
        &self.entries
    }

    pub fn summaries(&self) -> &InMemoryRepository<LogSummary> {
        &self.summaries
    }
}
