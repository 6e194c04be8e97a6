use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::info;

use crate::{
    BatchError,
    core::step::{RepeatStatus, StepExecution, Tasklet},
};

use super::{LogSummary, store::InMemoryLogStore};

/// Counts the stored log entries per level and per day.
///
/// One summary is saved per (level, date) group, ordered by level then date.
/// The summaries are written inside the step transaction.
pub struct LogAggregationTasklet<'a> {
    store: &'a InMemoryLogStore,
}

impl<'a> LogAggregationTasklet<'a> {
    pub fn new(store: &'a InMemoryLogStore) -> Self {
        Self { store }
    }
}

impl Tasklet for LogAggregationTasklet<'_> {
    fn execute(&self, step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
        let mut counts: BTreeMap<(String, NaiveDate), u32> = BTreeMap::new();
        for entry in self.store.entries().find_all()? {
            *counts
                .entry((entry.level, entry.timestamp.date()))
                .or_default() += 1;
        }

        let summaries: Vec<LogSummary> = counts
            .into_iter()
            .map(|((level, log_date), count)| LogSummary {
                id: None,
                level,
                log_date,
                count,
            })
            .collect();

        info!(
            "Step {} aggregated log entries into {} summaries",
            step_execution.name,
            summaries.len()
        );
        self.store.summaries().save_all(&summaries)?;

        Ok(RepeatStatus::Finished)
    }
}
