use std::{fs::File, io::Write};

use batch_flow::{
    core::{
        item::PassThroughProcessor,
        job::{BatchStatus, Job, JobParametersBuilder},
        step::StepStatus,
    },
    item::csv::csv_reader::{CsvItemReader, CsvItemReaderBuilder},
    logs::{
        LogEntry,
        job::{
            AGGREGATE_STEP_NAME, IMPORT_STEP_NAME, aggregate_log_data_step,
            import_log_entries_step, log_aggregation_job,
        },
        store::InMemoryLogStore,
        tasklet::LogAggregationTasklet,
    },
};
use tempfile::NamedTempFile;

const LOG_LINES: &str = "timestamp,level,component,message
2025-06-23 09:00:00,INFO,Auth,User logged in successfully.
2025-06-23 09:00:05,ERROR,Database,Database connection lost.
2025-06-23 09:00:10,INFO,Payment,Payment processed successfully.
2025-06-23 23:59:59,WARN,Order,Order delayed due to inventory check.
2025-06-24 00:00:04,INFO,Auth,Invalid credentials provided.
2025-06-24 00:00:09,ERROR,Database,Database connection lost.
2025-06-24 00:00:14,ERROR,Notification,Database connection lost.
";

fn log_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn counts_log_lines_per_level_and_day() -> anyhow::Result<()> {
    let file = log_file(LOG_LINES);
    let reader: CsvItemReader<File, LogEntry> = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_path(file.path())?;
    let store = InMemoryLogStore::new();
    let processor = PassThroughProcessor::new();
    let tasklet = LogAggregationTasklet::new(&store);

    let import = import_log_entries_step(&reader, &processor, &store)?;
    let aggregate = aggregate_log_data_step(&tasklet, &store);
    let job = log_aggregation_job(&import, &aggregate)?;

    let parameters = JobParametersBuilder::new().add_run_timestamp("time").build()?;
    let execution = job.run(parameters)?;

    assert_eq!(execution.status, BatchStatus::Completed);
    let import_execution = execution.get_step_execution(IMPORT_STEP_NAME).unwrap();
    assert_eq!(import_execution.write_count, 7);
    assert_eq!(import_execution.commit_count, 2);
    let aggregate_execution = execution.get_step_execution(AGGREGATE_STEP_NAME).unwrap();
    assert_eq!(aggregate_execution.status, StepStatus::Success);

    let summaries: Vec<String> = store
        .summaries()
        .find_all()?
        .into_iter()
        .map(|summary| format!("{} {} {}", summary.level, summary.log_date, summary.count))
        .collect();
    assert_eq!(
        summaries,
        vec![
            "ERROR 2025-06-23 1",
            "ERROR 2025-06-24 2",
            "INFO 2025-06-23 2",
            "INFO 2025-06-24 1",
            "WARN 2025-06-23 1",
        ]
    );
    Ok(())
}

#[test]
fn bad_timestamp_fails_before_aggregation() -> anyhow::Result<()> {
    let file = log_file(
        "timestamp,level,component,message
2025-06-23 09:00:00,INFO,Auth,User logged in successfully.
23/06/2025 09:00,ERROR,Database,Database connection lost.
",
    );
    let reader: CsvItemReader<File, LogEntry> = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_path(file.path())?;
    let store = InMemoryLogStore::new();
    let processor = PassThroughProcessor::new();
    let tasklet = LogAggregationTasklet::new(&store);

    let import = import_log_entries_step(&reader, &processor, &store)?;
    let aggregate = aggregate_log_data_step(&tasklet, &store);
    let job = log_aggregation_job(&import, &aggregate)?;

    let execution = job.run(JobParametersBuilder::new().add_long("time", 1).build()?)?;

    assert_eq!(execution.status, BatchStatus::Failed);
    assert!(execution.get_step_execution(AGGREGATE_STEP_NAME).is_none());
    assert_eq!(store.entries().count()?, 0);
    assert_eq!(store.summaries().count()?, 0);
    Ok(())
}
