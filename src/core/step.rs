use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::BatchError;

use super::{
    chunk::{Chunk, ChunkStatus},
    item::{ItemProcessor, ItemReader, ItemWriter},
    transaction::{ResourcelessTransactionManager, Transaction, TransactionManager},
};

static RESOURCELESS_TRANSACTION_MANAGER: ResourcelessTransactionManager =
    ResourcelessTransactionManager;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum StepStatus {
    Starting,
    Started,
    Success,
    ReadError,
    ProcessorError,
    WriteError,
    TransactionError,
    TaskletError,
}

/// Metrics and state of one step within one job execution.
///
/// A fresh `StepExecution` is created each time the orchestrator visits a step,
/// so steps themselves stay stateless across executions.
#[derive(Debug)]
pub struct StepExecution {
    /// Unique identifier for this step execution
    pub id: Uuid,
    /// Name of the step that produced this execution
    pub name: String,
    pub status: StepStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Number of items pulled from the reader
    pub read_count: usize,
    /// Number of items written by committed chunks
    pub write_count: usize,
    /// Number of items dropped by the processor in committed chunks
    pub filter_count: usize,
    pub commit_count: usize,
    pub rollback_count: usize,
}

impl StepExecution {
    pub fn new(name: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: StepStatus::Starting,
            start_time: now,
            end_time: now,
            duration: Duration::default(),
            read_count: 0,
            write_count: 0,
            filter_count: 0,
            commit_count: 0,
            rollback_count: 0,
        }
    }

    fn record_timing(&mut self, start_time: Instant) {
        self.start_time = start_time;
        self.end_time = Instant::now();
        self.duration = start_time.elapsed();
    }
}

/// A named unit of work in a job's flow.
pub trait Step {
    fn get_name(&self) -> &str;

    /// Executes the step, recording metrics in `step_execution`.
    ///
    /// # Returns
    /// - `Ok(())`: the step completed successfully
    /// - `Err(BatchError)`: the step failed; `step_execution.status` tells which phase
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError>;
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum RepeatStatus {
    /// The tasklet has more work and must be invoked again.
    Continuable,
    /// The tasklet has finished executing.
    Finished,
}

/// Single unit of work executed without chunking.
pub trait Tasklet {
    fn execute(&self, step_execution: &StepExecution) -> Result<RepeatStatus, BatchError>;
}

/// Tasklet that only logs a message and finishes.
pub struct LoggingTasklet {
    message: String,
}

impl LoggingTasklet {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Tasklet for LoggingTasklet {
    fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
        info!("{}", self.message);
        Ok(RepeatStatus::Finished)
    }
}

pub struct TaskletStep<'a> {
    name: String,
    tasklet: &'a dyn Tasklet,
    transaction_manager: &'a dyn TransactionManager,
}

impl Step for TaskletStep<'_> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();
        step_execution.status = StepStatus::Started;
        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let result = self.run_tasklet(step_execution);
        step_execution.record_timing(start_time);

        match result {
            Ok(()) => {
                step_execution.status = StepStatus::Success;
                info!(
                    "End of step: {}, id: {}",
                    step_execution.name, step_execution.id
                );
                Ok(())
            }
            Err(error) => {
                error!("Step {} failed: {}", step_execution.name, error);
                Err(error)
            }
        }
    }
}

impl TaskletStep<'_> {
    /// Invokes the tasklet until it finishes, all inside one transaction.
    fn run_tasklet(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let transaction = match Transaction::begin(self.transaction_manager) {
            Ok(transaction) => transaction,
            Err(error) => {
                step_execution.status = StepStatus::TransactionError;
                return Err(error);
            }
        };

        loop {
            match self.tasklet.execute(step_execution) {
                Ok(RepeatStatus::Continuable) => debug!("Tasklet continuable, invoking again"),
                Ok(RepeatStatus::Finished) => break,
                Err(error) => {
                    drop(transaction);
                    step_execution.rollback_count += 1;
                    step_execution.status = StepStatus::TaskletError;
                    return Err(error);
                }
            }
        }

        if let Err(error) = transaction.commit() {
            step_execution.rollback_count += 1;
            step_execution.status = StepStatus::TransactionError;
            return Err(error);
        }
        step_execution.commit_count += 1;
        Ok(())
    }
}

pub struct TaskletStepBuilder<'a> {
    name: String,
    tasklet: &'a dyn Tasklet,
    transaction_manager: &'a dyn TransactionManager,
}

impl<'a> TaskletStepBuilder<'a> {
    pub fn new(name: &str, tasklet: &'a dyn Tasklet) -> Self {
        Self {
            name: name.to_string(),
            tasklet,
            transaction_manager: &RESOURCELESS_TRANSACTION_MANAGER,
        }
    }

    pub fn transaction_manager(mut self, transaction_manager: &'a dyn TransactionManager) -> Self {
        self.transaction_manager = transaction_manager;
        self
    }

    pub fn build(self) -> TaskletStep<'a> {
        TaskletStep {
            name: self.name,
            tasklet: self.tasklet,
            transaction_manager: self.transaction_manager,
        }
    }
}

/// Step driving a read, process, write loop over fixed-size chunks.
///
/// Each chunk runs in its own transaction. A failure rolls back the current
/// chunk only: chunks committed before it stay committed.
pub struct ChunkOrientedStep<'a, I, O> {
    name: String,
    /// Component responsible for reading items from the source
    reader: &'a dyn ItemReader<I>,
    /// Component responsible for processing items
    processor: &'a dyn ItemProcessor<I, O>,
    /// Component responsible for writing items to the destination
    writer: &'a dyn ItemWriter<O>,
    /// Number of items to read in each chunk
    chunk_size: u16,
    transaction_manager: &'a dyn TransactionManager,
}

impl<I, O> Step for ChunkOrientedStep<'_, I, O> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();
        step_execution.status = StepStatus::Started;

        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let result = match self.writer.open() {
            Ok(()) => self.process_chunks(step_execution),
            Err(error) => {
                step_execution.status = StepStatus::WriteError;
                Err(error)
            }
        };

        Self::manage_error(self.writer.close());
        step_execution.record_timing(start_time);

        match result {
            Ok(()) => {
                step_execution.status = StepStatus::Success;
                info!(
                    "End of step: {}, id: {}, read: {}, written: {}, filtered: {}",
                    step_execution.name,
                    step_execution.id,
                    step_execution.read_count,
                    step_execution.write_count,
                    step_execution.filter_count
                );
                Ok(())
            }
            Err(error) => {
                error!("Step {} failed: {}", step_execution.name, error);
                Err(error)
            }
        }
    }
}

impl<I, O> ChunkOrientedStep<'_, I, O> {
    fn process_chunks(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        loop {
            let transaction = match Transaction::begin(self.transaction_manager) {
                Ok(transaction) => transaction,
                Err(error) => {
                    step_execution.status = StepStatus::TransactionError;
                    return Err(error);
                }
            };

            match self.run_chunk(step_execution, transaction) {
                Ok(Some(ChunkStatus::Full)) => continue,
                Ok(Some(ChunkStatus::Finished)) | Ok(None) => return Ok(()),
                Err(error) => {
                    step_execution.rollback_count += 1;
                    return Err(error);
                }
            }
        }
    }

    /// Reads, processes and writes one chunk, then commits it.
    ///
    /// Returns `Ok(None)` when the reader had nothing left: such an empty chunk
    /// is neither written nor committed. Any error drops `transaction`, which
    /// rolls the chunk back.
    fn run_chunk(
        &self,
        step_execution: &mut StepExecution,
        transaction: Transaction<'_>,
    ) -> Result<Option<ChunkStatus>, BatchError> {
        let chunk = self.read_chunk(step_execution)?;
        if chunk.is_empty() {
            debug!("No more items to read");
            return Ok(None);
        }

        let (processed_items, filtered) = self.process_chunk(step_execution, chunk.get_items())?;
        self.write_chunk(step_execution, &processed_items)?;

        if let Err(error) = transaction.commit() {
            step_execution.status = StepStatus::TransactionError;
            return Err(error);
        }

        step_execution.commit_count += 1;
        step_execution.write_count += processed_items.len();
        step_execution.filter_count += filtered;

        Ok(Some(chunk.get_status()))
    }

    /// Reads up to `chunk_size` items, stopping early at the end of data.
    fn read_chunk(&self, step_execution: &mut StepExecution) -> Result<Chunk<I>, BatchError> {
        debug!("Start reading chunk");

        let mut chunk = Chunk::new(self.chunk_size as usize);

        loop {
            match self.reader.read() {
                Ok(Some(item)) => {
                    step_execution.read_count += 1;
                    if chunk.add_item(item) {
                        return Ok(chunk);
                    }
                }
                Ok(None) => {
                    chunk.finish();
                    return Ok(chunk);
                }
                Err(error) => {
                    step_execution.status = StepStatus::ReadError;
                    return Err(error);
                }
            }
        }
    }

    /// Applies the processor to each item in source order.
    ///
    /// Returns the surviving items together with the number of filtered ones.
    fn process_chunk(
        &self,
        step_execution: &mut StepExecution,
        read_items: &[I],
    ) -> Result<(Vec<O>, usize), BatchError> {
        debug!("Processing chunk of {} items", read_items.len());

        let mut result = Vec::with_capacity(read_items.len());
        let mut filtered = 0;

        for item in read_items {
            match self.processor.process(item) {
                Ok(Some(processed_item)) => result.push(processed_item),
                Ok(None) => filtered += 1,
                Err(error) => {
                    step_execution.status = StepStatus::ProcessorError;
                    return Err(error);
                }
            }
        }

        Ok((result, filtered))
    }

    fn write_chunk(
        &self,
        step_execution: &mut StepExecution,
        processed_items: &[O],
    ) -> Result<(), BatchError> {
        if processed_items.is_empty() {
            debug!("No items to write, skipping write call");
            return Ok(());
        }

        debug!("Writing chunk of {} items", processed_items.len());

        let result = self
            .writer
            .write(processed_items)
            .and_then(|()| self.writer.flush());

        if result.is_err() {
            step_execution.status = StepStatus::WriteError;
        }
        result
    }

    fn manage_error(result: Result<(), BatchError>) {
        if let Err(error) = result {
            warn!("Non-fatal error: {}", error);
        }
    }
}

pub struct ChunkOrientedStepBuilder<'a, I, O> {
    name: String,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<&'a dyn ItemProcessor<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: u16,
    transaction_manager: &'a dyn TransactionManager,
}

impl<'a, I, O> ChunkOrientedStepBuilder<'a, I, O> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reader: None,
            processor: None,
            writer: None,
            chunk_size: 10,
            transaction_manager: &RESOURCELESS_TRANSACTION_MANAGER,
        }
    }

    pub fn reader(mut self, reader: &'a dyn ItemReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a dyn ItemProcessor<I, O>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a dyn ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn chunk_size(mut self, chunk_size: u16) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn transaction_manager(mut self, transaction_manager: &'a dyn TransactionManager) -> Self {
        self.transaction_manager = transaction_manager;
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<'a, I, O>, BatchError> {
        let missing = |component: &str| {
            BatchError::Configuration(format!("step '{}' has no {}", self.name, component))
        };

        let reader = self.reader.ok_or_else(|| missing("reader"))?;
        let processor = self.processor.ok_or_else(|| missing("processor"))?;
        let writer = self.writer.ok_or_else(|| missing("writer"))?;

        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(format!(
                "step '{}' must have a chunk size of at least 1",
                self.name
            )));
        }

        Ok(ChunkOrientedStep {
            name: self.name,
            reader,
            processor,
            writer,
            chunk_size: self.chunk_size,
            transaction_manager: self.transaction_manager,
        })
    }
}

/// Entry point for building either kind of step.
pub struct StepBuilder {
    name: String,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn tasklet<'a>(self, tasklet: &'a dyn Tasklet) -> TaskletStepBuilder<'a> {
        TaskletStepBuilder::new(&self.name, tasklet)
    }

    pub fn chunk<'a, I, O>(self, chunk_size: u16) -> ChunkOrientedStepBuilder<'a, I, O> {
        ChunkOrientedStepBuilder::new(&self.name).chunk_size(chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::core::item::{ItemProcessorResult, ItemReaderResult, ItemWriterResult};

    struct VecReader {
        items: RefCell<Vec<u32>>,
        calls_after_end: Cell<usize>,
        exhausted: Cell<bool>,
    }

    impl VecReader {
        fn new(count: u32) -> Self {
            Self {
                items: RefCell::new((1..=count).rev().collect()),
                calls_after_end: Cell::new(0),
                exhausted: Cell::new(false),
            }
        }
    }

    impl ItemReader<u32> for VecReader {
        fn read(&self) -> ItemReaderResult<u32> {
            if self.exhausted.get() {
                self.calls_after_end.set(self.calls_after_end.get() + 1);
            }
            let item = self.items.borrow_mut().pop();
            if item.is_none() {
                self.exhausted.set(true);
            }
            Ok(item)
        }
    }

    /// Drops the items listed in `filtered`, fails on `failing`.
    #[derive(Default)]
    struct SelectiveProcessor {
        filtered: Vec<u32>,
        failing: Option<u32>,
    }

    impl ItemProcessor<u32, u32> for SelectiveProcessor {
        fn process(&self, item: &u32) -> ItemProcessorResult<u32> {
            if self.failing == Some(*item) {
                return Err(BatchError::ItemProcessor(format!("cannot process {}", item)));
            }
            if self.filtered.contains(item) {
                return Ok(None);
            }
            Ok(Some(*item))
        }
    }

    #[derive(Default)]
    struct ChunkRecorder {
        chunks: RefCell<Vec<Vec<u32>>>,
    }

    impl ItemWriter<u32> for ChunkRecorder {
        fn write(&self, items: &[u32]) -> ItemWriterResult {
            self.chunks.borrow_mut().push(items.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingTransactionManager {
        commits: Cell<usize>,
        rollbacks: Cell<usize>,
    }

    impl TransactionManager for CountingTransactionManager {
        fn begin(&self) -> Result<(), BatchError> {
            Ok(())
        }

        fn commit(&self) -> Result<(), BatchError> {
            self.commits.set(self.commits.get() + 1);
            Ok(())
        }

        fn rollback(&self) -> Result<(), BatchError> {
            self.rollbacks.set(self.rollbacks.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn seven_items_in_chunks_of_five_with_one_filtered() {
        let reader = VecReader::new(7);
        let processor = SelectiveProcessor {
            filtered: vec![6],
            ..Default::default()
        };
        let writer = ChunkRecorder::default();
        let transaction_manager = CountingTransactionManager::default();

        let step = StepBuilder::new("import")
            .chunk(5)
            .reader(&reader)
            .processor(&processor)
            .writer(&writer)
            .transaction_manager(&transaction_manager)
            .build()
            .unwrap();

        let mut step_execution = StepExecution::new(step.get_name());
        step.execute(&mut step_execution).unwrap();

        assert_eq!(step_execution.status, StepStatus::Success);
        assert_eq!(step_execution.read_count, 7);
        assert_eq!(step_execution.write_count, 6);
        assert_eq!(step_execution.filter_count, 1);
        assert_eq!(step_execution.commit_count, 2);
        assert_eq!(
            *writer.chunks.borrow(),
            vec![vec![1, 2, 3, 4, 5], vec![7]]
        );
        assert_eq!(transaction_manager.commits.get(), 2);
        assert_eq!(reader.calls_after_end.get(), 0);
    }

    #[test]
    fn chunk_count_is_ceiling_of_items_over_chunk_size() {
        for (items, chunk_size, expected) in [(0, 3, 0), (1, 1, 1), (9, 3, 3), (10, 3, 4), (10, 1, 10)] {
            let reader = VecReader::new(items);
            let processor = SelectiveProcessor::default();
            let writer = ChunkRecorder::default();

            let step = StepBuilder::new("count")
                .chunk(chunk_size)
                .reader(&reader)
                .processor(&processor)
                .writer(&writer)
                .build()
                .unwrap();

            let mut step_execution = StepExecution::new("count");
            step.execute(&mut step_execution).unwrap();

            assert_eq!(step_execution.commit_count, expected);
            assert_eq!(
                step_execution.read_count,
                step_execution.write_count + step_execution.filter_count
            );
        }
    }

    #[test]
    fn fully_filtered_chunk_commits_without_writing() {
        let reader = VecReader::new(3);
        let processor = SelectiveProcessor {
            filtered: vec![1, 2, 3],
            ..Default::default()
        };
        let writer = ChunkRecorder::default();
        let transaction_manager = CountingTransactionManager::default();

        let step = StepBuilder::new("filter-all")
            .chunk(3)
            .reader(&reader)
            .processor(&processor)
            .writer(&writer)
            .transaction_manager(&transaction_manager)
            .build()
            .unwrap();

        let mut step_execution = StepExecution::new("filter-all");
        step.execute(&mut step_execution).unwrap();

        assert!(writer.chunks.borrow().is_empty());
        assert_eq!(step_execution.write_count, 0);
        assert_eq!(step_execution.filter_count, 3);
        assert_eq!(step_execution.commit_count, 1);
        assert_eq!(transaction_manager.commits.get(), 1);
    }

    #[test]
    fn processor_failure_rolls_back_current_chunk_only() {
        let reader = VecReader::new(7);
        let processor = SelectiveProcessor {
            failing: Some(4),
            ..Default::default()
        };
        let writer = ChunkRecorder::default();
        let transaction_manager = CountingTransactionManager::default();

        let step = StepBuilder::new("failing")
            .chunk(2)
            .reader(&reader)
            .processor(&processor)
            .writer(&writer)
            .transaction_manager(&transaction_manager)
            .build()
            .unwrap();

        let mut step_execution = StepExecution::new("failing");
        let result = step.execute(&mut step_execution);

        assert!(matches!(result, Err(BatchError::ItemProcessor(_))));
        assert_eq!(step_execution.status, StepStatus::ProcessorError);
        assert_eq!(step_execution.write_count, 2);
        assert_eq!(step_execution.commit_count, 1);
        assert_eq!(step_execution.rollback_count, 1);
        assert_eq!(*writer.chunks.borrow(), vec![vec![1, 2]]);
        assert_eq!(transaction_manager.rollbacks.get(), 1);
    }

    #[test]
    fn build_rejects_zero_chunk_size_and_missing_components() {
        let reader = VecReader::new(1);
        let processor = SelectiveProcessor::default();
        let writer = ChunkRecorder::default();

        let zero = StepBuilder::new("zero")
            .chunk(0)
            .reader(&reader)
            .processor(&processor)
            .writer(&writer)
            .build();
        assert!(matches!(zero, Err(BatchError::Configuration(_))));

        let no_writer = StepBuilder::new("no-writer")
            .chunk::<u32, u32>(1)
            .reader(&reader)
            .processor(&processor)
            .build();
        assert!(matches!(no_writer, Err(BatchError::Configuration(_))));
    }

    struct PollingTasklet {
        remaining: Cell<u32>,
    }

    impl Tasklet for PollingTasklet {
        fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
            let remaining = self.remaining.get();
            if remaining == 0 {
                return Ok(RepeatStatus::Finished);
            }
            self.remaining.set(remaining - 1);
            Ok(RepeatStatus::Continuable)
        }
    }

    #[test]
    fn continuable_tasklet_is_invoked_until_finished_in_one_transaction() {
        let tasklet = PollingTasklet {
            remaining: Cell::new(3),
        };
        let transaction_manager = CountingTransactionManager::default();

        let step = StepBuilder::new("poll")
            .tasklet(&tasklet)
            .transaction_manager(&transaction_manager)
            .build();

        let mut step_execution = StepExecution::new("poll");
        step.execute(&mut step_execution).unwrap();

        assert_eq!(tasklet.remaining.get(), 0);
        assert_eq!(step_execution.status, StepStatus::Success);
        assert_eq!(transaction_manager.commits.get(), 1);
    }

    struct FailingTasklet;

    impl Tasklet for FailingTasklet {
        fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
            Err(BatchError::Tasklet("boom".to_string()))
        }
    }

    #[test]
    fn failing_tasklet_rolls_back() {
        let tasklet = FailingTasklet;
        let transaction_manager = CountingTransactionManager::default();

        let step = StepBuilder::new("fail")
            .tasklet(&tasklet)
            .transaction_manager(&transaction_manager)
            .build();

        let mut step_execution = StepExecution::new("fail");
        let result = step.execute(&mut step_execution);

        assert!(result.is_err());
        assert_eq!(step_execution.status, StepStatus::TaskletError);
        assert_eq!(transaction_manager.rollbacks.get(), 1);
        assert_eq!(transaction_manager.commits.get(), 0);
    }

    #[test]
    fn logging_tasklet_finishes_on_first_call() {
        let tasklet = LoggingTasklet::new("nothing to do");

        let status = tasklet.execute(&StepExecution::new("noop")).unwrap();

        assert_eq!(status, RepeatStatus::Finished);
    }
}
