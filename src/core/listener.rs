use crate::BatchError;

use super::job::JobExecution;

/// Observer of the job lifecycle.
///
/// Listeners are invoked in registration order. `before_job` runs once the
/// execution is `RUNNING` and before the first node; an error there aborts the
/// run. `after_job` runs exactly once per run, whatever the outcome, and its
/// errors are reported without changing the execution status.
pub trait JobExecutionListener {
    fn before_job(&self, _job_execution: &mut JobExecution) -> Result<(), BatchError> {
        Ok(())
    }

    fn after_job(&self, _job_execution: &JobExecution) -> Result<(), BatchError> {
        Ok(())
    }
}
