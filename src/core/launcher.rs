use std::collections::HashMap;

use log::{error, info};
use serde::Serialize;
use uuid::Uuid;

use crate::BatchError;

use super::job::{BatchStatus, Job, JobParameters, JobParametersBuilder};

/// Outcome of a launch, as reported to whoever triggered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchResponse {
    pub job_name: String,
    pub execution_id: Uuid,
    pub status: BatchStatus,
    pub failures: Vec<String>,
}

/// Registry of jobs that can be launched by name.
///
/// The launcher runs each job synchronously on the caller's thread. It does
/// not serialize launches of the same job: callers that need mutual exclusion
/// must provide it themselves.
#[derive(Default)]
pub struct JobLauncher<'a> {
    jobs: HashMap<String, &'a dyn Job>,
}

impl<'a> JobLauncher<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job: &'a dyn Job) -> Result<(), BatchError> {
        let name = job.get_name().to_string();
        if self.jobs.contains_key(&name) {
            return Err(BatchError::Configuration(format!(
                "a job named '{}' is already registered",
                name
            )));
        }
        self.jobs.insert(name, job);
        Ok(())
    }

    pub fn job_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.jobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn launch(
        &self,
        job_name: &str,
        parameters: JobParameters,
    ) -> Result<LaunchResponse, BatchError> {
        let job = self
            .jobs
            .get(job_name)
            .ok_or_else(|| BatchError::JobNotFound(job_name.to_string()))?;

        info!("Launching job {} with parameters {}", job_name, parameters);
        let execution = job.run(parameters)?;

        if execution.status == BatchStatus::Failed {
            error!(
                "Job {} execution {} failed",
                job_name, execution.id
            );
        }

        Ok(LaunchResponse {
            job_name: execution.job_name.clone(),
            execution_id: execution.id,
            status: execution.status,
            failures: execution.failures.iter().map(ToString::to_string).collect(),
        })
    }

    /// Launches `job_name` with a single `startAt` parameter holding the current time.
    pub fn launch_now(&self, job_name: &str) -> Result<LaunchResponse, BatchError> {
        let parameters = JobParametersBuilder::new()
            .add_run_timestamp("startAt")
            .build()?;
        self.launch(job_name, parameters)
    }
}

/// Renders a launch result as the message returned to the triggering caller.
pub fn launch_message(result: &Result<LaunchResponse, BatchError>) -> String {
    match result {
        Ok(response) if response.status == BatchStatus::Failed => {
            let cause = response
                .failures
                .first()
                .cloned()
                .unwrap_or_else(|| "job finished with status FAILED".to_string());
            format!("Error starting job: {}", cause)
        }
        Ok(_) => "Job started successfully.".to_string(),
        Err(error) => format!("Error starting job: {}", error),
    }
}
