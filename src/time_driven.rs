//! Presenting a time-driven submodel through the event-driven contract.
//!
//! Next events are placed one grain apart, starting from the initial
//! event, and run out once they would pass `initial + extent`. A model
//! that reports convergence during boundary update ends its loop early.

use crate::configuration::{Configuration, Scale};
use crate::error::SubmodelError;
use crate::submodel::{Inputs, Observations, Submodel, SubmodelDescription, TimeDrivenSubmodel};

/// Wrap `model` so the engine can drive it like any other submodel.
pub fn adapt(model: Box<dyn TimeDrivenSubmodel>) -> Box<dyn Submodel> {
    Box::new(TimeDrivenAdapter {
        model,
        time_scale: None,
        initial_event: 0.0,
    })
}

struct TimeDrivenAdapter {
    model: Box<dyn TimeDrivenSubmodel>,
    time_scale: Option<Scale>,
    initial_event: f64,
}

impl TimeDrivenAdapter {
    fn next_event_after(&self, event: f64) -> Result<Option<f64>, SubmodelError> {
        let scale = self.time_scale.ok_or(SubmodelError::MissingTimeScale)?;
        let next = event + scale.grain;
        if self.initial_event + scale.extent < next {
            Ok(None)
        } else {
            Ok(Some(next))
        }
    }
}

impl Submodel for TimeDrivenAdapter {
    fn describe(&self) -> SubmodelDescription {
        self.model.describe()
    }

    fn initialise_state(
        &mut self,
        configuration: &Configuration,
        initial_event: f64,
        inputs: &Inputs,
    ) -> Result<Option<f64>, SubmodelError> {
        self.time_scale = Some(
            configuration
                .time_scale
                .ok_or(SubmodelError::MissingTimeScale)?,
        );
        self.initial_event = initial_event;

        let next_event = self.next_event_after(initial_event)?;
        self.model
            .initialise_state(configuration, initial_event, inputs)?;
        Ok(next_event)
    }

    fn solve(&mut self, event: f64, inputs: &Inputs) -> Result<Option<f64>, SubmodelError> {
        let next_event = self.next_event_after(event)?;
        self.model.solve(event, inputs)?;
        Ok(next_event)
    }

    fn update_boundary_conditions(
        &mut self,
        event: f64,
        next_event: Option<f64>,
        inputs: &Inputs,
    ) -> Result<Option<f64>, SubmodelError> {
        self.model.update_boundary_conditions(event, inputs)?;
        if self.model.has_converged() {
            return Ok(None);
        }
        Ok(next_event)
    }

    fn observe_intermediate_state(&self) -> Result<Observations, SubmodelError> {
        self.model.observe_intermediate_state()
    }

    fn observe_final_state(&self) -> Result<Observations, SubmodelError> {
        self.model.observe_final_state()
    }
}
