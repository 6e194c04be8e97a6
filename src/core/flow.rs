//! Flow graph of steps and deciders connected by outcome transitions.
//!
//! A [`Flow`] is built once with a [`FlowBuilder`] and validated eagerly, so
//! that configuration mistakes surface at startup instead of halfway through
//! a run.
//!
//! # Example
//!
//! ```rust
//! use batch_flow::core::decider::{FlowExecutionStatus, JobExecutionDecider};
//! use batch_flow::core::flow::{FlowBuilder, FlowNode};
//! use batch_flow::core::job::JobExecution;
//! use batch_flow::core::step::{LoggingTasklet, StepBuilder};
//! use batch_flow::BatchError;
//!
//! struct AlwaysProcess;
//!
//! impl JobExecutionDecider for AlwaysProcess {
//!     fn get_name(&self) -> &str {
//!         "always-process"
//!     }
//!
//!     fn decide(&self, _execution: &JobExecution) -> Result<FlowExecutionStatus, BatchError> {
//!         Ok(FlowExecutionStatus::new("PROCESS"))
//!     }
//! }
//!
//! # fn main() -> Result<(), BatchError> {
//! let import = LoggingTasklet::new("importing");
//! let process = LoggingTasklet::new("processing");
//! let import_step = StepBuilder::new("import").tasklet(&import).build();
//! let process_step = StepBuilder::new("process").tasklet(&process).build();
//! let decider = AlwaysProcess;
//!
//! let flow = FlowBuilder::new()
//!     .start(FlowNode::step(&import_step))
//!     .next(FlowNode::decider(&decider))
//!     .on("PROCESS")
//!     .to(FlowNode::step(&process_step))
//!     .build()?;
//!
//! assert_eq!(flow.start_node().get_name(), "import");
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::BatchError;

use super::{
    decider::{FlowExecutionStatus, JobExecutionDecider},
    step::Step,
};

/// A node of the flow: either a step (chunk or tasklet) or a decider.
#[derive(Clone, Copy)]
pub enum FlowNode<'a> {
    Step(&'a dyn Step),
    Decider(&'a dyn JobExecutionDecider),
}

impl<'a> FlowNode<'a> {
    pub fn step(step: &'a dyn Step) -> Self {
        FlowNode::Step(step)
    }

    pub fn decider(decider: &'a dyn JobExecutionDecider) -> Self {
        FlowNode::Decider(decider)
    }

    pub fn get_name(&self) -> &'a str {
        match *self {
            FlowNode::Step(step) => step.get_name(),
            FlowNode::Decider(decider) => decider.get_name(),
        }
    }

    fn is_same_node(&self, other: &FlowNode<'_>) -> bool {
        match (*self, *other) {
            (FlowNode::Step(a), FlowNode::Step(b)) => std::ptr::addr_eq(a, b),
            (FlowNode::Decider(a), FlowNode::Decider(b)) => std::ptr::addr_eq(a, b),
            _ => false,
        }
    }
}

type Transitions = HashMap<String, HashMap<FlowExecutionStatus, String>>;

/// Validated flow graph.
pub struct Flow<'a> {
    start: FlowNode<'a>,
    nodes: HashMap<String, FlowNode<'a>>,
    transitions: Transitions,
}

impl<'a> Flow<'a> {
    pub fn start_node(&self) -> FlowNode<'a> {
        self.start
    }

    pub fn get_node(&self, name: &str) -> Option<FlowNode<'a>> {
        self.nodes.get(name).copied()
    }

    /// Resolves the node following `from` for the given outcome.
    ///
    /// # Returns
    /// - `Ok(Some(node))`: the transition target
    /// - `Ok(None)`: `from` is a terminal node (it has no outgoing transition at all)
    /// - `Err(BatchError::Routing)`: `from` has transitions, but none for `outcome`
    pub fn next_node(
        &self,
        from: &str,
        outcome: &FlowExecutionStatus,
    ) -> Result<Option<FlowNode<'a>>, BatchError> {
        let Some(edges) = self.transitions.get(from).filter(|edges| !edges.is_empty()) else {
            return Ok(None);
        };

        let target = edges.get(outcome).ok_or_else(|| BatchError::Routing {
            node: from.to_string(),
            outcome: outcome.to_string(),
        })?;

        self.get_node(target)
            .map(Some)
            .ok_or_else(|| BatchError::Configuration(format!("unknown node '{}'", target)))
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        self.transitions.get(name).is_none_or(HashMap::is_empty)
    }
}

/// Fluent builder for a [`Flow`].
///
/// `next(node)` links the current node to `node` on `COMPLETED`;
/// `on(token).to(node)` links it on any other token; `from(node)` moves the
/// cursor back to an already registered node to declare its other branches.
#[derive(Default)]
pub struct FlowBuilder<'a> {
    start: Option<String>,
    current: Option<String>,
    nodes: HashMap<String, FlowNode<'a>>,
    registration_order: Vec<String>,
    transitions: Transitions,
    errors: Vec<String>,
}

impl<'a> FlowBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, node: FlowNode<'a>) -> Self {
        let name = self.register(node);
        if let Some(start) = &self.start {
            self.errors
                .push(format!("flow already starts at '{}', cannot start at '{}'", start, name));
        } else {
            self.start = Some(name.clone());
        }
        self.current = Some(name);
        self
    }

    pub fn next(mut self, node: FlowNode<'a>) -> Self {
        let name = self.register(node);
        match self.current.take() {
            Some(from) => self.add_transition(&from, FlowExecutionStatus::completed(), &name),
            None => self
                .errors
                .push(format!("'{}' added with next() before start()", name)),
        }
        self.current = Some(name);
        self
    }

    pub fn on(self, outcome: &str) -> TransitionBuilder<'a> {
        TransitionBuilder {
            builder: self,
            outcome: FlowExecutionStatus::new(outcome),
        }
    }

    pub fn from(mut self, node: FlowNode<'a>) -> Self {
        let name = node.get_name().to_string();
        match self.nodes.get(&name) {
            Some(known) if known.is_same_node(&node) => {}
            Some(_) => self
                .errors
                .push(format!("two different nodes are named '{}'", name)),
            None => self
                .errors
                .push(format!("from() refers to '{}' which is not part of the flow", name)),
        }
        self.current = Some(name);
        self
    }

    pub fn build(self) -> Result<Flow<'a>, BatchError> {
        if let Some(error) = self.errors.first() {
            return Err(BatchError::Configuration(error.clone()));
        }

        let start = self
            .start
            .as_ref()
            .and_then(|name| self.nodes.get(name).copied())
            .ok_or_else(|| BatchError::Configuration("flow has no start node".to_string()))?;

        self.validate_deciders()?;
        self.validate_steps()?;
        self.validate_terminal_reachable(start.get_name())?;

        debug!(
            "Flow built with {} nodes starting at '{}'",
            self.nodes.len(),
            start.get_name()
        );

        Ok(Flow {
            start,
            nodes: self.nodes,
            transitions: self.transitions,
        })
    }

    fn register(&mut self, node: FlowNode<'a>) -> String {
        let name = node.get_name().to_string();
        match self.nodes.get(&name) {
            Some(known) if !known.is_same_node(&node) => self
                .errors
                .push(format!("two different nodes are named '{}'", name)),
            Some(_) => {}
            None => {
                self.nodes.insert(name.clone(), node);
                self.registration_order.push(name.clone());
            }
        }
        name
    }

    fn add_transition(&mut self, from: &str, outcome: FlowExecutionStatus, to: &str) {
        let edges = self.transitions.entry(from.to_string()).or_default();
        if let Some(existing) = edges.get(&outcome) {
            self.errors.push(format!(
                "duplicate transition from '{}' on '{}' (to '{}' and '{}')",
                from, outcome, existing, to
            ));
            return;
        }
        edges.insert(outcome, to.to_string());
    }

    fn validate_deciders(&self) -> Result<(), BatchError> {
        for name in &self.registration_order {
            let Some(FlowNode::Decider(decider)) = self.nodes.get(name) else {
                continue;
            };

            let edges = self.transitions.get(name);
            if edges.is_none_or(HashMap::is_empty) {
                return Err(BatchError::Configuration(format!(
                    "decider '{}' has no transitions",
                    name
                )));
            }

            let outcomes = decider.outcomes();
            let mut targets: HashMap<&str, &FlowExecutionStatus> = HashMap::new();
            for outcome in &outcomes {
                let target = edges.and_then(|edges| edges.get(outcome)).ok_or_else(|| {
                    BatchError::Configuration(format!(
                        "decider '{}' has no transition for outcome '{}'",
                        name, outcome
                    ))
                })?;
                if let Some(other) = targets.insert(target.as_str(), outcome) {
                    return Err(BatchError::Configuration(format!(
                        "decider '{}' routes '{}' and '{}' to the same node '{}'",
                        name, other, outcome, target
                    )));
                }
            }
        }
        Ok(())
    }

    /// A finished step always reports `COMPLETED`, so a step with outgoing
    /// transitions must have one for it.
    fn validate_steps(&self) -> Result<(), BatchError> {
        for name in &self.registration_order {
            let Some(FlowNode::Step(_)) = self.nodes.get(name) else {
                continue;
            };
            let Some(edges) = self.transitions.get(name).filter(|edges| !edges.is_empty()) else {
                continue;
            };
            if !edges.contains_key(&FlowExecutionStatus::completed()) {
                return Err(BatchError::Configuration(format!(
                    "step '{}' has no transition for outcome '{}'",
                    name,
                    FlowExecutionStatus::completed()
                )));
            }
        }
        Ok(())
    }

    fn validate_terminal_reachable(&self, start: &str) -> Result<(), BatchError> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(name) = queue.pop_front() {
            if !visited.insert(name) {
                continue;
            }
            match self.transitions.get(name).filter(|edges| !edges.is_empty()) {
                None => return Ok(()),
                Some(edges) => queue.extend(edges.values().map(String::as_str)),
            }
        }

        Err(BatchError::Configuration(format!(
            "no terminal node is reachable from '{}'",
            start
        )))
    }
}

/// Pending transition created by [`FlowBuilder::on`].
pub struct TransitionBuilder<'a> {
    builder: FlowBuilder<'a>,
    outcome: FlowExecutionStatus,
}

impl<'a> TransitionBuilder<'a> {
    pub fn to(self, node: FlowNode<'a>) -> FlowBuilder<'a> {
        let mut builder = self.builder;
        let name = builder.register(node);
        match builder.current.take() {
            Some(from) => builder.add_transition(&from, self.outcome, &name),
            None => builder.errors.push(format!(
                "transition on '{}' to '{}' has no source node",
                self.outcome, name
            )),
        }
        builder.current = Some(name);
        builder
    }
}
