use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("ItemProcessor from: {0}")]
    ItemProcessor(String),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("Tasklet from: {0}")]
    Tasklet(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Step {0} failed")]
    Step(String),

    /// A node produced an outcome for which the flow has no transition.
    #[error("No transition from node '{node}' for outcome '{outcome}'")]
    Routing { node: String, outcome: String },

    #[error("Invalid flow configuration: {0}")]
    Configuration(String),

    #[error("Invalid job parameters: {0}")]
    JobParameters(String),

    #[error("Listener from: {0}")]
    Listener(String),

    #[error("Decider from: {0}")]
    Decider(String),

    #[error("No job registered with name: {0}")]
    JobNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
