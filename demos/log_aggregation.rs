//! Aggregates log lines into per-level, per-day counts.
//!
//! With a CSV path argument (`timestamp,level,component,message`), the lines
//! are read from that file. Otherwise fifty random entries are generated.
//!
//! Run with `RUST_LOG=info cargo run --example log_aggregation --features csv [path]`.

use std::fs::File;

use batch_flow::{
    core::{
        item::{ItemReader, PassThroughProcessor},
        job::{Job, JobParametersBuilder},
    },
    item::csv::csv_reader::{CsvItemReader, CsvItemReaderBuilder},
    logs::{
        LogEntry,
        generator::RandomLogEntryReader,
        job::{aggregate_log_data_step, import_log_entries_step, log_aggregation_job},
        store::InMemoryLogStore,
        tasklet::LogAggregationTasklet,
    },
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let csv_reader: Option<CsvItemReader<File, LogEntry>> = match std::env::args().nth(1) {
        Some(path) => Some(CsvItemReaderBuilder::new().has_headers(true).from_path(path)?),
        None => None,
    };
    let generator = RandomLogEntryReader::new(50);
    let reader: &dyn ItemReader<LogEntry> = match &csv_reader {
        Some(csv_reader) => csv_reader,
        None => &generator,
    };

    let store = InMemoryLogStore::new();
    let processor = PassThroughProcessor::new();
    let tasklet = LogAggregationTasklet::new(&store);

    let import = import_log_entries_step(reader, &processor, &store)?;
    let aggregate = aggregate_log_data_step(&tasklet, &store);
    let job = log_aggregation_job(&import, &aggregate)?;

    let parameters = JobParametersBuilder::new().add_run_timestamp("time").build()?;
    let execution = job.run(parameters)?;

    println!("Job {} finished with status {}", job.get_name(), execution.status);
    for summary in store.summaries().find_all()? {
        println!("{} {:>5} {}", summary.log_date, summary.level, summary.count);
    }

    Ok(())
}
