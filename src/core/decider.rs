use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::BatchError;

use super::job::JobExecution;

/// Outcome token produced by a flow node and matched against its transitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowExecutionStatus(String);

impl FlowExecutionStatus {
    /// Outcome of every step that completed successfully.
    pub const COMPLETED: &'static str = "COMPLETED";
    pub const PROCESS: &'static str = "PROCESS";
    pub const NO_PENDING: &'static str = "NO_PENDING";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn completed() -> Self {
        Self::new(Self::COMPLETED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlowExecutionStatus {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Read-only branching node of a flow.
///
/// A decider answers a question about external state and returns the outcome
/// token that selects the next node. It must not modify domain data.
pub trait JobExecutionDecider {
    fn get_name(&self) -> &str;

    fn decide(&self, job_execution: &JobExecution) -> Result<FlowExecutionStatus, BatchError>;

    /// The closed set of tokens this decider can return.
    ///
    /// When non-empty, flow validation requires a transition for each of them.
    /// An empty set defers the check to run time.
    fn outcomes(&self) -> Vec<FlowExecutionStatus> {
        Vec::new()
    }
}

/// Read-only repository query used by deciders.
pub trait RecordCounter<P> {
    fn count_matching(&self, predicate: &P) -> Result<u64, BatchError>;
}

/// Decider routing on whether any record matches a predicate.
///
/// Returns `PROCESS` when the count is positive and `NO_PENDING` otherwise,
/// unless other tokens are configured with [`PendingWorkDecider::outcomes_named`].
pub struct PendingWorkDecider<'a, P> {
    name: String,
    counter: &'a dyn RecordCounter<P>,
    predicate: P,
    process: FlowExecutionStatus,
    no_pending: FlowExecutionStatus,
}

impl<'a, P> PendingWorkDecider<'a, P> {
    pub fn new(name: &str, counter: &'a dyn RecordCounter<P>, predicate: P) -> Self {
        Self {
            name: name.to_string(),
            counter,
            predicate,
            process: FlowExecutionStatus::new(FlowExecutionStatus::PROCESS),
            no_pending: FlowExecutionStatus::new(FlowExecutionStatus::NO_PENDING),
        }
    }

    pub fn outcomes_named(mut self, process: &str, no_pending: &str) -> Self {
        self.process = FlowExecutionStatus::new(process);
        self.no_pending = FlowExecutionStatus::new(no_pending);
        self
    }
}

impl<P: fmt::Debug> JobExecutionDecider for PendingWorkDecider<'_, P> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn decide(&self, job_execution: &JobExecution) -> Result<FlowExecutionStatus, BatchError> {
        let count = self.counter.count_matching(&self.predicate)?;
        info!(
            "Decider {} found {} records matching {:?} for execution {}",
            self.name, count, self.predicate, job_execution.id
        );

        if count > 0 {
            Ok(self.process.clone())
        } else {
            Ok(self.no_pending.clone())
        }
    }

    fn outcomes(&self) -> Vec<FlowExecutionStatus> {
        vec![self.process.clone(), self.no_pending.clone()]
    }
}
