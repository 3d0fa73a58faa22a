//! Structured error types for the coupler.
//!
//! Three families, matching where a failure can originate:
//! - [`ConstructionError`]: the element/conduit description does not
//!   resolve to a well-formed execution graph. Nothing is built.
//! - [`SubmodelError`]: raised by user submodel code. The engine never
//!   retries; the run stops and the error reaches the caller.
//! - [`SimulationError`]: everything `run` can return, including the two
//!   above and protocol violations that indicate a construction defect.

use thiserror::Error;

use crate::node::NodeKey;
use crate::operator::Operator;

// ── Submodel errors ───────────────────────────────────────────────────

/// A failure reported by a submodel's contract method.
#[derive(Debug, Error)]
pub enum SubmodelError {
    /// The numerical scheme blew up.
    #[error("solver diverged at event {event}: {reason}")]
    Diverged { event: f64, reason: String },

    /// A received message could not be used.
    #[error("invalid input on endpoint `{endpoint}`: {reason}")]
    InvalidInput { endpoint: String, reason: String },

    /// A time-driven submodel was configured without a time scale.
    #[error("configuration has no time scale")]
    MissingTimeScale,

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl SubmodelError {
    /// Wrap an arbitrary error raised inside a submodel.
    pub fn custom(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        SubmodelError::Custom(Box::new(err))
    }
}

// ── Construction errors ───────────────────────────────────────────────

/// Graph construction or builder validation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// Two compute elements share a name.
    #[error("compute element `{0}` is defined more than once")]
    DuplicateElement(String),

    /// A conduit or configuration names an element that does not exist.
    #[error("compute element `{0}` not found")]
    UnknownElement(String),

    /// A conduit names an endpoint the element does not declare.
    #[error("endpoint `{endpoint}` not found on element `{element}`")]
    UnknownEndpoint { element: String, endpoint: String },

    /// An endpoint name collides with the control slot or a control label.
    #[error("endpoint name `{endpoint}` on element `{element}` is reserved")]
    ReservedEndpointName { element: String, endpoint: String },

    /// The sending side of a conduit is not on O_I or O_F.
    #[error("endpoint `{endpoint}` of `{element}` is on {operator}, which cannot send")]
    NotASender {
        element: String,
        endpoint: String,
        operator: Operator,
    },

    /// The receiving side of a conduit is not on F_INIT, S or B.
    #[error("endpoint `{endpoint}` of `{element}` is on {operator}, which cannot receive")]
    NotAReceiver {
        element: String,
        endpoint: String,
        operator: Operator,
    },

    /// An endpoint resolved to zero or several stage nodes.
    #[error("`{element}.{operator}` resolved to {matches} nodes, expected exactly one")]
    NodeResolution {
        element: String,
        operator: Operator,
        matches: usize,
    },

    /// A sending endpoint is wired to more than one conduit.
    #[error("sending endpoint `{element}.{endpoint}` is already connected")]
    DuplicateSender { element: String, endpoint: String },

    /// A receiving endpoint is fed by more than one conduit.
    #[error("receiving endpoint `{element}.{endpoint}` is already connected")]
    DuplicateReceiver { element: String, endpoint: String },

    /// A compute element has no configuration to initialise with.
    #[error("no configuration for compute element `{0}`")]
    MissingConfiguration(String),

    /// A configuration sets a parameter the submodel does not describe.
    #[error("element `{element}` has no parameter `{parameter}`")]
    UnknownParameter { element: String, parameter: String },

    /// A configuration sets a parameter with a value of the wrong kind.
    #[error("parameter `{parameter}` of `{element}` expects {expected}")]
    ParameterType {
        element: String,
        parameter: String,
        expected: &'static str,
    },
}

// ── Simulation errors ─────────────────────────────────────────────────

/// Everything that can stop a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// A submodel failed while its stage node was firing.
    #[error("submodel failed in {node}: {source}")]
    Submodel {
        node: NodeKey,
        #[source]
        source: SubmodelError,
    },

    /// A stage sent on an endpoint with no outgoing edge.
    #[error("{node} sent on `{endpoint}`, which has no outgoing edge")]
    ProtocolViolation { node: NodeKey, endpoint: String },

    /// A message was posted to a slot the inbox does not have.
    #[error("{node} has no inbox slot `{endpoint}`")]
    UnknownSlot { node: NodeKey, endpoint: String },

    /// A node fired while one of its slots was still empty.
    #[error("{node} fired with empty slot `{endpoint}`")]
    IncompleteInbox { node: NodeKey, endpoint: String },

    /// The control slot did not hold a repeat flag.
    #[error("{node} received a control message without a repeat flag")]
    MalformedControl { node: NodeKey },
}

impl SimulationError {
    /// The submodel failure behind this error, if that is what it is.
    pub fn submodel_error(&self) -> Option<&SubmodelError> {
        match self {
            SimulationError::Submodel { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;
