//! The contract user-supplied submodels implement.
//!
//! The engine only ever drives the event-driven [`Submodel`] trait.
//! Fixed-timestep models implement [`TimeDrivenSubmodel`] instead and are
//! turned into a `Submodel` by [`crate::time_driven::adapt`];
//! [`SubmodelKind`] carries either variant until that point.

use std::collections::BTreeMap;

use crate::configuration::{Configuration, ParameterValue, Parameters};
use crate::error::{ConstructionError, SubmodelError};
use crate::message::{Message, Payload};
use crate::operator::{Endpoint, Operator};

/// Messages received by a stage, keyed by receiving endpoint name.
/// The control slot has already been removed.
pub type Inputs = BTreeMap<String, Message>;

/// Named observations returned by the observation stages, keyed by
/// sending endpoint name.
pub type Observations = BTreeMap<String, Payload>;

// ── Description ───────────────────────────────────────────────────────

/// The kind of value a parameter expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterKind {
    Integer,
    Float,
    Text,
}

impl ParameterKind {
    fn accepts(self, value: &ParameterValue) -> bool {
        match (self, value) {
            (ParameterKind::Integer, ParameterValue::Integer(_)) => true,
            (ParameterKind::Float, ParameterValue::Float(_) | ParameterValue::Integer(_)) => true,
            (ParameterKind::Text, ParameterValue::Text(_)) => true,
            _ => false,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ParameterKind::Integer => "an integer",
            ParameterKind::Float => "a number",
            ParameterKind::Text => "text",
        }
    }
}

/// What a submodel exposes: its endpoints and its parameter schema.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SubmodelDescription {
    pub num_spatial_dimensions: usize,
    pub endpoints: Vec<Endpoint>,
    pub parameters: BTreeMap<String, ParameterKind>,
}

impl SubmodelDescription {
    pub fn new(num_spatial_dimensions: usize) -> Self {
        SubmodelDescription {
            num_spatial_dimensions,
            ..Default::default()
        }
    }

    pub fn add_endpoint(&mut self, operator: Operator, name: impl Into<String>) -> &mut Self {
        self.endpoints.push(Endpoint::new(operator, name));
        self
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, kind: ParameterKind) -> &mut Self {
        self.parameters.insert(name.into(), kind);
        self
    }

    /// Find a declared endpoint by name.
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    /// Check configured parameters against the declared schema.
    pub fn check_parameters(
        &self,
        element: &str,
        parameters: &Parameters,
    ) -> Result<(), ConstructionError> {
        for (name, value) in parameters {
            let kind = self.parameters.get(name).ok_or_else(|| {
                ConstructionError::UnknownParameter {
                    element: element.to_string(),
                    parameter: name.clone(),
                }
            })?;
            if !kind.accepts(value) {
                return Err(ConstructionError::ParameterType {
                    element: element.to_string(),
                    parameter: name.clone(),
                    expected: kind.describe(),
                });
            }
        }
        Ok(())
    }
}

// ── Event-driven contract ─────────────────────────────────────────────

/// An event-driven submodel.
///
/// Each method corresponds to one stage of the execution loop. A
/// returned `None` for the next event means "no further event": after
/// boundary update this ends the current loop.
///
/// # Example
///
/// ```rust
/// use coupler::configuration::Configuration;
/// use coupler::error::SubmodelError;
/// use coupler::submodel::{Inputs, Observations, Submodel, SubmodelDescription};
///
/// struct Countdown { left: u32 }
///
/// impl Submodel for Countdown {
///     fn describe(&self) -> SubmodelDescription { SubmodelDescription::new(0) }
///     fn initialise_state(&mut self, _: &Configuration, event: f64, _: &Inputs)
///         -> Result<Option<f64>, SubmodelError> { Ok(Some(event + 1.0)) }
///     fn solve(&mut self, event: f64, _: &Inputs) -> Result<Option<f64>, SubmodelError> {
///         self.left = self.left.saturating_sub(1);
///         Ok(Some(event + 1.0))
///     }
///     fn update_boundary_conditions(&mut self, _: f64, next: Option<f64>, _: &Inputs)
///         -> Result<Option<f64>, SubmodelError> {
///         Ok(if self.left == 0 { None } else { next })
///     }
///     fn observe_intermediate_state(&self) -> Result<Observations, SubmodelError> {
///         Ok(Observations::new())
///     }
///     fn observe_final_state(&self) -> Result<Observations, SubmodelError> {
///         Ok(Observations::new())
///     }
/// }
/// ```
pub trait Submodel {
    /// Endpoints and parameter schema.
    fn describe(&self) -> SubmodelDescription;

    /// Set up state for `initial_event`; returns the first event to solve for.
    fn initialise_state(
        &mut self,
        configuration: &Configuration,
        initial_event: f64,
        inputs: &Inputs,
    ) -> Result<Option<f64>, SubmodelError>;

    /// Advance to `event`; returns the event after it.
    fn solve(&mut self, event: f64, inputs: &Inputs) -> Result<Option<f64>, SubmodelError>;

    /// Apply boundary conditions at `event`; may revise or clear `next_event`.
    fn update_boundary_conditions(
        &mut self,
        event: f64,
        next_event: Option<f64>,
        inputs: &Inputs,
    ) -> Result<Option<f64>, SubmodelError>;

    fn observe_intermediate_state(&self) -> Result<Observations, SubmodelError>;

    fn observe_final_state(&self) -> Result<Observations, SubmodelError>;
}

// ── Time-driven contract ──────────────────────────────────────────────

/// A submodel stepping on a fixed time grain.
///
/// Time is absolute and the step comes from the configuration's time
/// scale. Instead of returning next events, the model reports
/// convergence through `has_converged`.
pub trait TimeDrivenSubmodel {
    fn describe(&self) -> SubmodelDescription;

    fn initialise_state(
        &mut self,
        configuration: &Configuration,
        initial_time: f64,
        inputs: &Inputs,
    ) -> Result<(), SubmodelError>;

    fn solve(&mut self, time: f64, inputs: &Inputs) -> Result<(), SubmodelError>;

    fn update_boundary_conditions(&mut self, time: f64, inputs: &Inputs) -> Result<(), SubmodelError>;

    /// Whether the model has reached a steady state and may stop early.
    fn has_converged(&self) -> bool;

    fn observe_intermediate_state(&self) -> Result<Observations, SubmodelError>;

    fn observe_final_state(&self) -> Result<Observations, SubmodelError>;
}

// ── SubmodelKind ──────────────────────────────────────────────────────

/// Either flavour of submodel, before it is handed to the engine.
pub enum SubmodelKind {
    EventDriven(Box<dyn Submodel>),
    TimeDriven(Box<dyn TimeDrivenSubmodel>),
}

impl SubmodelKind {
    pub fn event_driven(model: impl Submodel + 'static) -> Self {
        SubmodelKind::EventDriven(Box::new(model))
    }

    pub fn time_driven(model: impl TimeDrivenSubmodel + 'static) -> Self {
        SubmodelKind::TimeDriven(Box::new(model))
    }

    pub fn describe(&self) -> SubmodelDescription {
        match self {
            SubmodelKind::EventDriven(m) => m.describe(),
            SubmodelKind::TimeDriven(m) => m.describe(),
        }
    }

    /// Present this submodel through the event-driven contract.
    pub fn into_event_driven(self) -> Box<dyn Submodel> {
        match self {
            SubmodelKind::EventDriven(m) => m,
            SubmodelKind::TimeDriven(m) => crate::time_driven::adapt(m),
        }
    }
}

impl std::fmt::Debug for SubmodelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmodelKind::EventDriven(_) => f.write_str("SubmodelKind::EventDriven"),
            SubmodelKind::TimeDriven(_) => f.write_str("SubmodelKind::TimeDriven"),
        }
    }
}
