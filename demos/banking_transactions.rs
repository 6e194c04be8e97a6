//! Imports banking transactions from CSV and processes the pending ones.
//!
//! Run with `RUST_LOG=info cargo run --example banking_transactions --features csv [path]`.
//! Without a path, a small embedded file is used.

use std::{fs::File, io::Read};

use anyhow::Context;
use batch_flow::{
    banking::{
        TransactionRecord, TransactionStatus,
        job::{
            banking_transaction_job, import_transaction_step, no_transaction_step,
            process_transaction_step, transaction_decider,
        },
        listener::JobCompletionNotificationListener,
        processor::{MarkProcessedProcessor, TransactionImportProcessor},
        reader::PendingTransactionReader,
        repository::InMemoryTransactionRepository,
    },
    core::{
        job::{Job, JobParametersBuilder},
        step::LoggingTasklet,
    },
    item::csv::csv_reader::{CsvItemReader, CsvItemReaderBuilder},
};

const TRANSACTIONS: &str = "accountNumber,amount,transactionDate
ACC-1001,250.00,2025-06-20
ACC-1002,-75.50,2025-06-20
ACC-1003,1200.10,2025-06-21
ACC-1001,-10.00,2025-06-22
ACC-1004,42.00,2025-06-23";

fn open_source() -> anyhow::Result<Box<dyn Read>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path).with_context(|| format!("cannot open {}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(TRANSACTIONS.as_bytes())),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let repository = InMemoryTransactionRepository::new();

    let source: CsvItemReader<_, TransactionRecord> = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_reader(open_source()?);
    let import_processor = TransactionImportProcessor;
    let pending_reader = PendingTransactionReader::new(&repository);
    let process_processor = MarkProcessedProcessor;
    let nothing_to_do = LoggingTasklet::new("No pending transactions found.");

    let import = import_transaction_step(&source, &import_processor, &repository)?;
    let decider = transaction_decider(&repository);
    let process = process_transaction_step(&pending_reader, &process_processor, &repository)?;
    let no_pending = no_transaction_step(&nothing_to_do, &repository);
    let listener = JobCompletionNotificationListener::new(&repository);

    let job = banking_transaction_job(&import, &decider, &process, &no_pending, &listener)?;

    let parameters = JobParametersBuilder::new()
        .add_run_timestamp("startAt")
        .build()?;
    let execution = job.run(parameters)?;

    println!("Job {} finished with status {}", job.get_name(), execution.status);
    for step in &execution.step_executions {
        println!(
            "  {}: read={} written={} filtered={} commits={}",
            step.name, step.read_count, step.write_count, step.filter_count, step.commit_count
        );
    }
    println!(
        "Processed transactions: {}",
        repository.count_by_status(TransactionStatus::Processed)?
    );

    Ok(())
}
