//! Wiring of the banking transaction job.
//!
//! Each function builds one component; the caller owns them all and hands
//! references to [`banking_transaction_job`]:
//!
//! ```rust
//! use batch_flow::banking::{
//!     TransactionRecord,
//!     job::{
//!         banking_transaction_job, import_transaction_step, no_transaction_step,
//!         process_transaction_step, transaction_decider,
//!     },
//!     listener::JobCompletionNotificationListener,
//!     processor::{MarkProcessedProcessor, TransactionImportProcessor},
//!     reader::PendingTransactionReader,
//!     repository::InMemoryTransactionRepository,
//! };
//! use batch_flow::core::item::{ItemReader, ItemReaderResult};
//! use batch_flow::core::job::{BatchStatus, Job, JobParametersBuilder};
//! use batch_flow::core::step::LoggingTasklet;
//! # use batch_flow::BatchError;
//!
//! struct NoRecords;
//!
//! impl ItemReader<TransactionRecord> for NoRecords {
//!     fn read(&self) -> ItemReaderResult<TransactionRecord> {
//!         Ok(None)
//!     }
//! }
//!
//! # fn main() -> Result<(), BatchError> {
//! let repository = InMemoryTransactionRepository::new();
//! let source = NoRecords;
//! let import_processor = TransactionImportProcessor;
//! let pending_reader = PendingTransactionReader::new(&repository);
//! let process_processor = MarkProcessedProcessor;
//! let nothing_to_do = LoggingTasklet::new("No pending transactions found.");
//!
//! let import = import_transaction_step(&source, &import_processor, &repository)?;
//! let decider = transaction_decider(&repository);
//! let process = process_transaction_step(&pending_reader, &process_processor, &repository)?;
//! let no_pending = no_transaction_step(&nothing_to_do, &repository);
//! let listener = JobCompletionNotificationListener::new(&repository);
//!
//! let job = banking_transaction_job(&import, &decider, &process, &no_pending, &listener)?;
//! let parameters = JobParametersBuilder::new().add_run_timestamp("startAt").build()?;
//! let execution = job.run(parameters)?;
//!
//! assert_eq!(execution.status, BatchStatus::Completed);
//! assert!(execution.get_step_execution("noTransactionStep").is_some());
//! # Ok(())
//! # }
//! ```

use crate::{
    BatchError,
    core::{
        decider::{JobExecutionDecider, PendingWorkDecider},
        flow::{FlowBuilder, FlowNode},
        item::ItemReader,
        job::{JobBuilder, JobInstance},
        listener::JobExecutionListener,
        step::{ChunkOrientedStep, LoggingTasklet, Step, StepBuilder, TaskletStep},
    },
};

use super::{
    BankingTransaction, TransactionRecord, TransactionStatus,
    processor::{MarkProcessedProcessor, TransactionImportProcessor},
    reader::PendingTransactionReader,
    repository::InMemoryTransactionRepository,
};

pub const JOB_NAME: &str = "bankingTransactionJob";
pub const IMPORT_STEP_NAME: &str = "importTransactionStep";
pub const PROCESS_STEP_NAME: &str = "processTransactionStep";
pub const NO_TRANSACTION_STEP_NAME: &str = "noTransactionStep";
pub const DECIDER_NAME: &str = "transactionDecider";
pub const CHUNK_SIZE: u16 = 5;

/// Imports CSV rows as pending transactions.
pub fn import_transaction_step<'a>(
    reader: &'a dyn ItemReader<TransactionRecord>,
    processor: &'a TransactionImportProcessor,
    repository: &'a InMemoryTransactionRepository,
) -> Result<ChunkOrientedStep<'a, TransactionRecord, BankingTransaction>, BatchError> {
    StepBuilder::new(IMPORT_STEP_NAME)
        .chunk::<TransactionRecord, BankingTransaction>(CHUNK_SIZE)
        .reader(reader)
        .processor(processor)
        .writer(repository)
        .transaction_manager(repository)
        .build()
}

/// Routes on `PROCESS` when pending transactions exist, `NO_PENDING` otherwise.
pub fn transaction_decider(
    repository: &InMemoryTransactionRepository,
) -> PendingWorkDecider<'_, TransactionStatus> {
    PendingWorkDecider::new(DECIDER_NAME, repository, TransactionStatus::Pending)
}

/// Marks every pending transaction as processed.
pub fn process_transaction_step<'a>(
    reader: &'a PendingTransactionReader<'a>,
    processor: &'a MarkProcessedProcessor,
    repository: &'a InMemoryTransactionRepository,
) -> Result<ChunkOrientedStep<'a, BankingTransaction, BankingTransaction>, BatchError> {
    StepBuilder::new(PROCESS_STEP_NAME)
        .chunk::<BankingTransaction, BankingTransaction>(CHUNK_SIZE)
        .reader(reader)
        .processor(processor)
        .writer(repository)
        .transaction_manager(repository)
        .build()
}

pub fn no_transaction_step<'a>(
    tasklet: &'a LoggingTasklet,
    repository: &'a InMemoryTransactionRepository,
) -> TaskletStep<'a> {
    StepBuilder::new(NO_TRANSACTION_STEP_NAME)
        .tasklet(tasklet)
        .transaction_manager(repository)
        .build()
}

pub fn banking_transaction_job<'a>(
    import: &'a dyn Step,
    decider: &'a dyn JobExecutionDecider,
    process: &'a dyn Step,
    no_pending: &'a dyn Step,
    listener: &'a dyn JobExecutionListener,
) -> Result<JobInstance<'a>, BatchError> {
    let flow = FlowBuilder::new()
        .start(FlowNode::step(import))
        .next(FlowNode::decider(decider))
        .on("PROCESS")
        .to(FlowNode::step(process))
        .from(FlowNode::decider(decider))
        .on("NO_PENDING")
        .to(FlowNode::step(no_pending))
        .build()?;

    JobBuilder::new()
        .name(JOB_NAME)
        .flow(flow)
        .listener(listener)
        .build()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        banking::listener::JobCompletionNotificationListener,
        core::{
            item::ItemReaderResult,
            job::{BatchStatus, Job, JobParametersBuilder},
        },
    };

    struct VecReader {
        records: std::cell::RefCell<std::vec::IntoIter<TransactionRecord>>,
    }

    impl VecReader {
        fn new(amounts: &[f64]) -> Self {
            let records: Vec<TransactionRecord> = amounts
                .iter()
                .enumerate()
                .map(|(i, amount)| TransactionRecord {
                    account_number: format!("ACC-{}", i),
                    amount: *amount,
                    transaction_date: NaiveDate::from_ymd_opt(2025, 6, 23).unwrap(),
                })
                .collect();
            Self {
                records: std::cell::RefCell::new(records.into_iter()),
            }
        }
    }

    impl ItemReader<TransactionRecord> for VecReader {
        fn read(&self) -> ItemReaderResult<TransactionRecord> {
            Ok(self.records.borrow_mut().next())
        }
    }

    fn run(amounts: &[f64]) -> (InMemoryTransactionRepository, BatchStatus, Vec<String>) {
        let repository = InMemoryTransactionRepository::new();
        let status;
        let steps: Vec<String>;
        {
            let source = VecReader::new(amounts);
            let import_processor = TransactionImportProcessor;
            let pending_reader = PendingTransactionReader::new(&repository);
            let process_processor = MarkProcessedProcessor;
            let tasklet = LoggingTasklet::new("No pending transactions found.");

            let import = import_transaction_step(&source, &import_processor, &repository).unwrap();
            let decider = transaction_decider(&repository);
            let process =
                process_transaction_step(&pending_reader, &process_processor, &repository)
                    .unwrap();
            let no_pending = no_transaction_step(&tasklet, &repository);
            let listener = JobCompletionNotificationListener::new(&repository);

            let job =
                banking_transaction_job(&import, &decider, &process, &no_pending, &listener)
                    .unwrap();
            let parameters = JobParametersBuilder::new()
                .add_long("startAt", 1)
                .build()
                .unwrap();
            let execution = job.run(parameters).unwrap();

            status = execution.status;
            steps = execution
                .step_executions
                .iter()
                .map(|step| step.name.clone())
                .collect();
        }
        (repository, status, steps)
    }

    #[test]
    fn pending_transactions_are_processed() {
        let (repository, status, steps) = run(&[10.0, -5.0, 20.0]);

        assert_eq!(status, BatchStatus::Completed);
        assert_eq!(steps, vec![IMPORT_STEP_NAME, PROCESS_STEP_NAME]);
        assert_eq!(repository.count().unwrap(), 2);
        assert_eq!(
            repository.count_by_status(TransactionStatus::Processed).unwrap(),
            2
        );
        assert_eq!(
            repository.count_by_status(TransactionStatus::Pending).unwrap(),
            0
        );
    }

    #[test]
    fn only_negative_amounts_route_to_no_transaction_step() {
        let (repository, status, steps) = run(&[-1.0, -2.0]);

        assert_eq!(status, BatchStatus::Completed);
        assert_eq!(steps, vec![IMPORT_STEP_NAME, NO_TRANSACTION_STEP_NAME]);
        assert_eq!(repository.count().unwrap(), 0);
    }

    #[test]
    fn job_name_is_fixed() {
        let repository = InMemoryTransactionRepository::new();
        let source = VecReader::new(&[]);
        let import_processor = TransactionImportProcessor;
        let pending_reader = PendingTransactionReader::new(&repository);
        let process_processor = MarkProcessedProcessor;
        let tasklet = LoggingTasklet::new("No pending transactions found.");
        let import = import_transaction_step(&source, &import_processor, &repository).unwrap();
        let decider = transaction_decider(&repository);
        let process =
            process_transaction_step(&pending_reader, &process_processor, &repository).unwrap();
        let no_pending = no_transaction_step(&tasklet, &repository);
        let listener = JobCompletionNotificationListener::new(&repository);

        let job = banking_transaction_job(&import, &decider, &process, &no_pending, &listener)
            .unwrap();

        assert_eq!(job.get_name(), JOB_NAME);
    }
}
