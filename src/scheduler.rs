//! Deterministic dataflow scheduler.
//!
//! The engine repeatedly fires the first runnable node of the execution
//! graph, scanning in construction order. A node is runnable iff its
//! inbox is full. Firing takes the inbox, runs the stage against the
//! element's submodel, and posts every produced message along the edge
//! labelled with its sending endpoint. The run is complete when no node
//! is runnable.
//!
//! Two engines built from the same graph and configurations fire the
//! same nodes in the same order with the same events.

use tracing::{debug, error, info, trace, warn};

use crate::configuration::Configurations;
use crate::error::{ConstructionError, SimulationError, SimulationResult};
use crate::graph::ModelExecutionGraph;
use crate::message::Message;
use crate::node::{NodeIndex, NodeKey};
use crate::operator::{Operator, CONTROL_PREFIX, CONTROL_SLOT};
use crate::stage;

// ── Trace records ─────────────────────────────────────────────────────

/// One node firing, as recorded in the engine's trace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Firing {
    /// 1-based position in the run.
    pub step: u64,
    pub node: NodeKey,
    pub cur_event: f64,
    pub next_event: Option<f64>,
    pub repeat: bool,
    /// Sending endpoints whose messages were delivered, in send order.
    pub sent: Vec<String>,
}

impl std::fmt::Display for Firing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} @ {}", self.step, self.node, self.cur_event)?;
        match self.next_event {
            Some(next) => write!(f, " → {}", next)?,
            None => write!(f, " → -")?,
        }
        if self.repeat {
            write!(f, " (repeat)")?;
        }
        Ok(())
    }
}

/// Outcome of a run that reached completion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    /// Total firings since the engine was created.
    pub steps: u64,
    /// Nodes left holding some, but not all, of their messages.
    pub waiting: Vec<NodeKey>,
}

// ── Engine ────────────────────────────────────────────────────────────

/// Drives a [`ModelExecutionGraph`] to completion.
///
/// Owns the graph and the per-element configurations. Call `run` to
/// execute until no node is runnable, or `step` to fire exactly one.
pub struct SimulationEngine {
    graph: ModelExecutionGraph,
    configurations: Configurations,
    trace: Vec<Firing>,
    steps: u64,
}

impl SimulationEngine {
    /// Prepare `graph` for execution.
    ///
    /// Every element must have a configuration and every configuration
    /// must name an element. Each F_INIT node is then seeded with the
    /// control message `(0, 0, false)`.
    pub fn new(graph: ModelExecutionGraph, configurations: Configurations) -> SimulationResult<Self> {
        if let Some(name) = graph
            .element_names()
            .find(|name| !configurations.contains_key(*name))
        {
            return Err(ConstructionError::MissingConfiguration(name.to_string()).into());
        }
        if let Some(name) = configurations.keys().find(|name| !graph.has_element(name)) {
            return Err(ConstructionError::UnknownElement(name.clone()).into());
        }

        let mut engine = SimulationEngine {
            graph,
            configurations,
            trace: Vec::new(),
            steps: 0,
        };
        engine.seed()?;
        Ok(engine)
    }

    fn seed(&mut self) -> SimulationResult<()> {
        let initial: Vec<NodeIndex> = self
            .graph
            .nodes()
            .filter(|(_, n)| n.operator() == Operator::FInit)
            .map(|(i, _)| i)
            .collect();
        for index in initial {
            self.graph
                .node_mut(index)
                .post_message(CONTROL_SLOT, Message::control(0.0, Some(0.0), false))?;
        }
        Ok(())
    }

    /// The first runnable node in construction order.
    fn next_runnable(&self) -> Option<NodeIndex> {
        self.graph
            .nodes()
            .find(|(_, n)| n.is_runnable())
            .map(|(i, _)| i)
    }

    /// Fire one node.
    ///
    /// Returns the recorded firing, or `None` if no node is runnable.
    /// A submodel failure stops the engine where it is; the failed
    /// firing is not recorded.
    pub fn step(&mut self) -> SimulationResult<Option<Firing>> {
        let Some(index) = self.next_runnable() else {
            return Ok(None);
        };

        let node = self.graph.node_mut(index);
        let key = node.key().clone();
        let element = node.element();
        let slots = node.take_messages();

        let configuration = self
            .configurations
            .get(&key.element)
            .ok_or_else(|| ConstructionError::MissingConfiguration(key.element.clone()))?;
        let output = match stage::fire(&key, self.graph.submodel_mut(element), configuration, slots) {
            Ok(output) => output,
            Err(err) => {
                error!(node = %key, error = %err, "stage failed");
                return Err(err);
            }
        };

        let mut sent = Vec::with_capacity(output.messages.len());
        for (endpoint, message) in output.messages {
            if self.deliver(index, &key, &endpoint, message)? {
                sent.push(endpoint);
            }
        }

        self.steps += 1;
        let firing = Firing {
            step: self.steps,
            node: key,
            cur_event: output.cur_event,
            next_event: output.next_event,
            repeat: output.repeat,
            sent,
        };
        debug!(%firing, "fired");
        self.trace.push(firing.clone());
        Ok(Some(firing))
    }

    /// Route a message sent by `from` on `endpoint`.
    ///
    /// Returns `false` if the endpoint is declared but has no conduit, in
    /// which case the message is dropped.
    fn deliver(&mut self, from: NodeIndex, key: &NodeKey, endpoint: &str, message: Message) -> SimulationResult<bool> {
        let Some((to, slot)) = self.graph.find_receiver(from, endpoint) else {
            if !endpoint.starts_with(CONTROL_PREFIX) && self.graph.declares_endpoint(from, endpoint) {
                debug!(node = %key, endpoint, "sending endpoint has no conduit, observation dropped");
                return Ok(false);
            }
            return Err(SimulationError::ProtocolViolation {
                node: key.clone(),
                endpoint: endpoint.to_string(),
            });
        };
        let slot = slot.to_string();

        let target = self.graph.node_mut(to);
        trace!(from = %key, to = %target.key(), slot = %slot, %message, "delivered");
        if let Some(displaced) = target.post_message(&slot, message)? {
            warn!(node = %target.key(), slot = %slot, %displaced, "slot was occupied, message overwritten");
        }
        Ok(true)
    }

    /// Fire nodes until none is runnable.
    pub fn run(&mut self) -> SimulationResult<RunSummary> {
        info!(
            elements = self.graph.element_count(),
            nodes = self.graph.node_count(),
            "simulation started"
        );
        while self.step()?.is_some() {}

        let summary = self.summary();
        info!(steps = summary.steps, waiting = summary.waiting.len(), "simulation complete");
        Ok(summary)
    }

    /// Fire at most `max_steps` nodes.
    ///
    /// Returns the number fired in this call, which is less than
    /// `max_steps` only if the run completed.
    pub fn run_for(&mut self, max_steps: u64) -> SimulationResult<u64> {
        let start = self.steps;
        while self.steps - start < max_steps {
            if self.step()?.is_none() {
                break;
            }
        }
        Ok(self.steps - start)
    }

    /// `true` if no node is runnable.
    pub fn is_finished(&self) -> bool {
        self.next_runnable().is_none()
    }

    /// Steps taken so far and the nodes currently holding a partial inbox.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            steps: self.steps,
            waiting: self
                .graph
                .nodes()
                .filter(|(_, n)| n.inbox().is_partial())
                .map(|(_, n)| n.key().clone())
                .collect(),
        }
    }

    /// Total firings so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Every firing so far, in order.
    pub fn trace(&self) -> &[Firing] {
        &self.trace
    }

    /// The trace as a JSON array.
    #[cfg(feature = "serialize")]
    pub fn trace_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.trace)
    }

    pub fn graph(&self) -> &ModelExecutionGraph {
        &self.graph
    }

    pub fn configurations(&self) -> &Configurations {
        &self.configurations
    }

    /// Give the graph back, with its submodels in their final state.
    pub fn into_graph(self) -> ModelExecutionGraph {
        self.graph
    }
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("graph", &self.graph)
            .field("configurations", &self.configurations)
            .field("steps", &self.steps)
            .finish()
    }
}

/// Build an engine for `graph` and run it to completion.
pub fn run_simulation(graph: ModelExecutionGraph, configurations: Configurations) -> SimulationResult<RunSummary> {
    SimulationEngine::new(graph, configurations)?.run()
}
