use chrono::Utc;
use log::info;

use crate::{
    BatchError,
    core::{job::JobExecution, listener::JobExecutionListener},
};

use super::repository::InMemoryTransactionRepository;

pub const JOB_START_TIME_KEY: &str = "jobStartTime";

/// Logs the job start and, after a successful run, every stored transaction.
pub struct JobCompletionNotificationListener<'a> {
    repository: &'a InMemoryTransactionRepository,
}

impl<'a> JobCompletionNotificationListener<'a> {
    pub fn new(repository: &'a InMemoryTransactionRepository) -> Self {
        Self { repository }
    }

    /// Logs the stored transactions once the job has completed.
    ///
    /// Returns the number of transactions logged, or `None` when the run did
    /// not complete.
    fn verify(&self, job_execution: &JobExecution) -> Result<Option<usize>, BatchError> {
        if job_execution.status.is_running() || job_execution.status.is_unsuccessful() {
            info!(
                "Job did not complete successfully: {}",
                job_execution.status
            );
            return Ok(None);
        }

        info!("Job completed successfully! Verifying the results...");
        let transactions = self.repository.find_all()?;
        for transaction in &transactions {
            info!("Found transaction: {:?}", transaction);
        }
        Ok(Some(transactions.len()))
    }
}

impl JobExecutionListener for JobCompletionNotificationListener<'_> {
    fn before_job(&self, job_execution: &mut JobExecution) -> Result<(), BatchError> {
        let start_time = Utc::now();
        info!(
            "Job is starting. JobExecution ID: {} at {}",
            job_execution.id, start_time
        );
        job_execution
            .execution_context
            .put_long(JOB_START_TIME_KEY, start_time.timestamp_millis());
        Ok(())
    }

    fn after_job(&self, job_execution: &JobExecution) -> Result<(), BatchError> {
        self.verify(job_execution).map(|_| ())
    }
}
