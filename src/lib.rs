//! # Coupler: Multiscale Submodel Coupling
//!
//! Drives a set of coupled submodels, each following the Submodel
//! Execution Loop, as a deterministic dataflow over stage nodes. No
//! async, no threads: a node fires when every message it waits for has
//! arrived, and the first runnable node in construction order goes next.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          Simulation           │ ← builder: elements, conduits, configs
//! │  ┌────────────────────────┐  │
//! │  │    SimulationEngine     │  │ ← fires runnable nodes, routes messages
//! │  │  ┌──────────────────┐  │  │
//! │  │  │ ModelExecution-  │  │  │ ← 5 stage nodes per element + edges
//! │  │  │ Graph            │  │  │
//! │  │  └──────────────────┘  │  │
//! │  │  ┌──────────────────┐  │  │
//! │  │  │ stage            │  │  │ ← F_INIT / O_I / S / B / O_F
//! │  │  └──────────────────┘  │  │
//! │  │  ┌──────────────────┐  │  │
//! │  │  │ Submodel         │  │  │ ← user code (event- or time-driven)
//! │  │  └──────────────────┘  │  │
//! │  └────────────────────────┘  │
//! └──────────────────────────────┘
//! ```

pub mod configuration;
pub mod element;
pub mod error;
pub mod graph;
pub mod message;
pub mod node;
pub mod operator;
pub mod scheduler;
pub mod simulation;
pub mod submodel;
pub mod time_driven;

mod stage;

#[cfg(test)]
mod test_support;

// Re-exports for convenience.
pub use configuration::{merge_configuration, Configuration, Configurations, ParameterValue, Scale};
pub use element::{ComputeElement, Conduit};
pub use error::{ConstructionError, SimulationError, SimulationResult, SubmodelError};
pub use graph::{Edge, EdgeKind, ModelExecutionGraph};
pub use message::{Message, Payload};
pub use node::{ModelNode, NodeIndex, NodeKey};
pub use operator::{Endpoint, Operator};
pub use scheduler::{run_simulation, Firing, RunSummary, SimulationEngine};
pub use simulation::Simulation;
pub use submodel::{
    Inputs, Observations, ParameterKind, Submodel, SubmodelDescription, SubmodelKind, TimeDrivenSubmodel,
};
pub use time_driven::adapt;
