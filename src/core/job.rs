use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    decider::FlowExecutionStatus,
    flow::{Flow, FlowBuilder, FlowNode},
    listener::JobExecutionListener,
    step::{Step, StepExecution},
};

/// Type alias for job execution results.
///
/// A `JobResult` is a `Result` that contains either:
/// - A `JobExecution` with the final status of the run
/// - A `BatchError` when no execution could be created at all
pub type JobResult<T> = Result<T, BatchError>;

/// Represents a job that can be executed.
///
/// Each call to [`Job::run`] creates a fresh [`JobExecution`]. Failures during
/// the run are not returned as `Err`: they end the execution with status
/// `FAILED` and are listed in [`JobExecution::failures`].
pub trait Job {
    fn get_name(&self) -> &str;

    /// Runs the job with the given parameters.
    ///
    /// # Returns
    /// - `Ok(JobExecution)` once the run reached a terminal status
    /// - `Err(BatchError::JobParameters)` when the parameters are rejected
    fn run(&self, parameters: JobParameters) -> JobResult<JobExecution>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Created, not yet running.
    Starting,
    Running,
    Completed,
    Failed,
    /// Stopped by request before reaching a terminal node.
    Stopped,
}

impl BatchStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, BatchStatus::Starting | BatchStatus::Running)
    }

    pub fn is_unsuccessful(&self) -> bool {
        matches!(self, BatchStatus::Failed | BatchStatus::Stopped)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchStatus::Starting => "STARTING",
            BatchStatus::Running => "RUNNING",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
            BatchStatus::Stopped => "STOPPED",
        };
        f.write_str(label)
    }
}

/// Scalar value of a job parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobParameter {
    Long(i64),
    Double(f64),
    String(String),
    Bool(bool),
}

impl fmt::Display for JobParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobParameter::Long(value) => write!(f, "{}", value),
            JobParameter::Double(value) => write!(f, "{}", value),
            JobParameter::String(value) => write!(f, "{}", value),
            JobParameter::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// Parameters identifying one launch of a job.
///
/// Launches are never de-duplicated on parameter equality: callers that want
/// distinct runs to be recognisable add a value that changes on every call,
/// see [`JobParametersBuilder::add_run_timestamp`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawJobParameters")]
pub struct JobParameters {
    parameters: BTreeMap<String, JobParameter>,
}

#[derive(Deserialize)]
struct RawJobParameters {
    parameters: BTreeMap<String, JobParameter>,
}

/// Deserialized parameters go through the same key checks as the builder.
impl TryFrom<RawJobParameters> for JobParameters {
    type Error = BatchError;

    fn try_from(raw: RawJobParameters) -> Result<Self, Self::Error> {
        raw.parameters
            .into_iter()
            .fold(JobParametersBuilder::new(), |builder, (key, value)| {
                builder.add(&key, value)
            })
            .build()
    }
}

impl JobParameters {
    pub fn get(&self, key: &str) -> Option<&JobParameter> {
        self.parameters.get(key)
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.parameters.get(key) {
            Some(JobParameter::Long(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.parameters.get(key) {
            Some(JobParameter::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JobParameter)> {
        self.parameters.iter()
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .parameters
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

#[derive(Default)]
pub struct JobParametersBuilder {
    parameters: BTreeMap<String, JobParameter>,
    errors: Vec<String>,
}

impl JobParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_long(self, key: &str, value: i64) -> Self {
        self.add(key, JobParameter::Long(value))
    }

    pub fn add_double(self, key: &str, value: f64) -> Self {
        self.add(key, JobParameter::Double(value))
    }

    pub fn add_string(self, key: &str, value: &str) -> Self {
        self.add(key, JobParameter::String(value.to_string()))
    }

    pub fn add_bool(self, key: &str, value: bool) -> Self {
        self.add(key, JobParameter::Bool(value))
    }

    /// Adds the current time in epoch milliseconds under `key`.
    pub fn add_run_timestamp(self, key: &str) -> Self {
        self.add_long(key, Utc::now().timestamp_millis())
    }

    pub fn add(mut self, key: &str, value: JobParameter) -> Self {
        if key.trim().is_empty() {
            self.errors.push("parameter keys must not be blank".to_string());
        } else if self.parameters.contains_key(key) {
            self.errors.push(format!("parameter '{}' is defined twice", key));
        } else {
            self.parameters.insert(key.to_string(), value);
        }
        self
    }

    pub fn build(self) -> Result<JobParameters, BatchError> {
        if !self.errors.is_empty() {
            return Err(BatchError::JobParameters(self.errors.join("; ")));
        }
        Ok(JobParameters {
            parameters: self.parameters,
        })
    }
}

/// Key-value state scoped to one execution, shared by listeners, deciders and tasklets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    values: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    pub fn put(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn put_long(&mut self, key: &str, value: i64) {
        self.put(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(serde_json::Value::as_i64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// One run of a job.
///
/// The status moves from `STARTING` to `RUNNING` when the run begins and is
/// set exactly once to a terminal value when it ends.
#[derive(Debug)]
pub struct JobExecution {
    pub id: Uuid,
    pub job_name: String,
    pub parameters: JobParameters,
    pub status: BatchStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub execution_context: ExecutionContext,
    /// One entry per step visited, in visiting order
    pub step_executions: Vec<StepExecution>,
    /// Errors that ended the run, followed by any `after_job` listener errors
    pub failures: Vec<BatchError>,
}

impl JobExecution {
    pub fn new(job_name: &str, parameters: JobParameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            parameters,
            status: BatchStatus::Starting,
            start_time: None,
            end_time: None,
            execution_context: ExecutionContext::default(),
            step_executions: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn get_step_execution(&self, name: &str) -> Option<&StepExecution> {
        self.step_executions.iter().find(|step| step.name == name)
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.end_time? - self.start_time?)
    }
}

/// Cooperative stop request shared with a running job.
///
/// The orchestrator checks it before visiting each node. A chunk already in
/// progress completes or rolls back on its own.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// A configured job: a validated flow plus its listeners.
pub struct JobInstance<'a> {
    /// Unique identifier for this job instance
    id: Uuid,
    name: String,
    flow: Flow<'a>,
    listeners: Vec<&'a dyn JobExecutionListener>,
}

impl Job for JobInstance<'_> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn run(&self, parameters: JobParameters) -> JobResult<JobExecution> {
        self.run_with_stop_handle(parameters, &StopHandle::new())
    }
}

impl JobInstance<'_> {
    pub fn get_id(&self) -> Uuid {
        self.id
    }

    /// Runs the job, honouring stop requests made through `stop_handle`.
    pub fn run_with_stop_handle(
        &self,
        parameters: JobParameters,
        stop_handle: &StopHandle,
    ) -> JobResult<JobExecution> {
        if parameters.is_empty() {
            return Err(BatchError::JobParameters(format!(
                "job '{}' requires at least one parameter",
                self.name
            )));
        }

        let mut execution = JobExecution::new(&self.name, parameters);
        execution.status = BatchStatus::Running;
        execution.start_time = Some(Utc::now());

        info!(
            "Start of job: {}, execution id: {}, parameters: {}",
            self.name, execution.id, execution.parameters
        );

        let outcome = self
            .before_job(&mut execution)
            .and_then(|()| self.walk(&mut execution, stop_handle));

        execution.status = match outcome {
            Ok(status) => status,
            Err(error) => {
                error!("Job {} failed: {}", self.name, error);
                execution.failures.push(error);
                BatchStatus::Failed
            }
        };
        execution.end_time = Some(Utc::now());

        self.after_job(&mut execution);

        info!(
            "End of job: {}, execution id: {}, status: {}",
            self.name, execution.id, execution.status
        );

        Ok(execution)
    }

    fn before_job(&self, execution: &mut JobExecution) -> Result<(), BatchError> {
        for listener in &self.listeners {
            listener.before_job(execution)?;
        }
        Ok(())
    }

    fn after_job(&self, execution: &mut JobExecution) {
        let mut errors = Vec::new();
        for listener in &self.listeners {
            if let Err(error) = listener.after_job(execution) {
                warn!("Listener failed after job {}: {}", self.name, error);
                errors.push(error);
            }
        }
        execution.failures.extend(errors);
    }

    /// Walks the flow from its start node until a terminal node is reached.
    fn walk(
        &self,
        execution: &mut JobExecution,
        stop_handle: &StopHandle,
    ) -> Result<BatchStatus, BatchError> {
        let mut node = self.flow.start_node();

        loop {
            if stop_handle.is_stop_requested() {
                info!(
                    "Stop requested for job {} before node {}",
                    self.name,
                    node.get_name()
                );
                return Ok(BatchStatus::Stopped);
            }

            let outcome = match node {
                FlowNode::Step(step) => Self::execute_step(step, execution)?,
                FlowNode::Decider(decider) => {
                    let outcome = decider.decide(execution)?;
                    info!("Decider {} returned {}", decider.get_name(), outcome);
                    outcome
                }
            };

            match self.flow.next_node(node.get_name(), &outcome)? {
                Some(next) => node = next,
                None => return Ok(BatchStatus::Completed),
            }
        }
    }

    fn execute_step(
        step: &dyn Step,
        execution: &mut JobExecution,
    ) -> Result<FlowExecutionStatus, BatchError> {
        let mut step_execution = StepExecution::new(step.get_name());
        let result = step.execute(&mut step_execution);
        execution.step_executions.push(step_execution);
        result.map(|()| FlowExecutionStatus::completed())
    }
}

/// Builder for creating a job instance.
///
/// A job is either given a complete [`Flow`] with [`JobBuilder::flow`], or a
/// linear sequence of steps with [`JobBuilder::start`] and [`JobBuilder::next`].
#[derive(Default)]
pub struct JobBuilder<'a> {
    /// Optional name for the job (generated randomly if not specified)
    name: Option<String>,
    flow: Option<Flow<'a>>,
    steps: Option<FlowBuilder<'a>>,
    listeners: Vec<&'a dyn JobExecutionListener>,
}

impl<'a> JobBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> JobBuilder<'a> {
        self.name = Some(name.to_string());
        self
    }

    pub fn flow(mut self, flow: Flow<'a>) -> JobBuilder<'a> {
        self.flow = Some(flow);
        self
    }

    /// Sets the first step of a linear job.
    pub fn start(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        let steps = self.steps.take().unwrap_or_default();
        self.steps = Some(steps.start(FlowNode::step(step)));
        self
    }

    /// Adds a step run after the previous one completed.
    pub fn next(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        let steps = self.steps.take().unwrap_or_default();
        self.steps = Some(steps.next(FlowNode::step(step)));
        self
    }

    pub fn listener(mut self, listener: &'a dyn JobExecutionListener) -> JobBuilder<'a> {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> Result<JobInstance<'a>, BatchError> {
        let flow = match (self.flow, self.steps) {
            (Some(flow), None) => flow,
            (None, Some(steps)) => steps.build()?,
            (Some(_), Some(_)) => {
                return Err(BatchError::Configuration(
                    "a job takes either a flow or start/next steps, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(BatchError::Configuration("job has no steps".to_string()));
            }
        };

        Ok(JobInstance {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            flow,
            listeners: self.listeners,
        })
    }
}
