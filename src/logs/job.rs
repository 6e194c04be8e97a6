use crate::{
    BatchError,
    core::{
        item::{ItemReader, PassThroughProcessor},
        job::{JobBuilder, JobInstance},
        step::{ChunkOrientedStep, Step, StepBuilder, TaskletStep},
    },
};

use super::{LogEntry, store::InMemoryLogStore, tasklet::LogAggregationTasklet};

pub const JOB_NAME: &str = "logAggregationJob";
pub const IMPORT_STEP_NAME: &str = "importLogEntriesStep";
pub const AGGREGATE_STEP_NAME: &str = "aggregateLogDataStep";
pub const CHUNK_SIZE: u16 = 5;

/// Copies log entries from `reader` into the store, five per transaction.
pub fn import_log_entries_step<'a>(
    reader: &'a dyn ItemReader<LogEntry>,
    processor: &'a PassThroughProcessor<LogEntry>,
    store: &'a InMemoryLogStore,
) -> Result<ChunkOrientedStep<'a, LogEntry, LogEntry>, BatchError> {
    StepBuilder::new(IMPORT_STEP_NAME)
        .chunk::<LogEntry, LogEntry>(CHUNK_SIZE)
        .reader(reader)
        .processor(processor)
        .writer(store.entries())
        .transaction_manager(store.entries())
        .build()
}

pub fn aggregate_log_data_step<'a>(
    tasklet: &'a LogAggregationTasklet<'a>,
    store: &'a InMemoryLogStore,
) -> TaskletStep<'a> {
    StepBuilder::new(AGGREGATE_STEP_NAME)
        .tasklet(tasklet)
        .transaction_manager(store.summaries())
        .build()
}

pub fn log_aggregation_job<'a>(
    import: &'a dyn Step,
    aggregate: &'a dyn Step,
) -> Result<JobInstance<'a>, BatchError> {
    JobBuilder::new()
        .name(JOB_NAME)
        .start(import)
        .next(aggregate)
        .build()
}
