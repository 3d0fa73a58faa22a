//! Scripted submodels for tests.
//!
//! `Scripted` records every contract call into a shared log and lets a
//! test replace any stage's behaviour with a closure. Defaults: no next
//! event after initialisation or solving, boundary update passes the
//! next event through, no observations.

use std::cell::RefCell;
use std::rc::Rc;

use crate::configuration::Configuration;
use crate::error::SubmodelError;
use crate::message::Payload;
use crate::operator::{Endpoint, Operator};
use crate::submodel::{Inputs, Observations, Submodel, SubmodelDescription};

/// One recorded contract call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Init {
        event: f64,
        inputs: Vec<String>,
        configuration: Configuration,
    },
    Solve {
        event: f64,
        inputs: Vec<String>,
    },
    Boundary {
        event: f64,
        next_event: Option<f64>,
    },
    Intermediate,
    Final,
}

pub(crate) type CallLog = Rc<RefCell<Vec<Call>>>;

type EventFn = Box<dyn FnMut(f64, &Inputs) -> Result<Option<f64>, SubmodelError>>;
type BoundaryFn = Box<dyn FnMut(f64, Option<f64>, &Inputs) -> Result<Option<f64>, SubmodelError>>;

pub(crate) struct Scripted {
    endpoints: Vec<Endpoint>,
    log: CallLog,
    init: EventFn,
    solve: EventFn,
    boundary: BoundaryFn,
    intermediate: Observations,
    final_state: Observations,
}

impl Scripted {
    pub fn new() -> Self {
        Scripted {
            endpoints: Vec::new(),
            log: Rc::new(RefCell::new(Vec::new())),
            init: Box::new(|_, _| Ok(None)),
            solve: Box::new(|_, _| Ok(None)),
            boundary: Box::new(|_, next, _| Ok(next)),
            intermediate: Observations::new(),
            final_state: Observations::new(),
        }
    }

    /// A model that solves `steps` times, `dt` apart, then stops.
    pub fn stepping(steps: usize, dt: f64) -> Self {
        let solved = Rc::new(RefCell::new(0usize));
        let counter = Rc::clone(&solved);
        Scripted::new()
            .on_init(move |e, _| Ok(Some(e + dt)))
            .on_solve(move |e, _| {
                *counter.borrow_mut() += 1;
                Ok(Some(e + dt))
            })
            .on_boundary(move |_, next, _| Ok(if *solved.borrow() >= steps { None } else { next }))
    }

    pub fn with_endpoints(mut self, endpoints: &[(Operator, &str)]) -> Self {
        self.endpoints = endpoints
            .iter()
            .map(|(op, name)| Endpoint::new(*op, *name))
            .collect();
        self
    }

    pub fn on_init(mut self, f: impl FnMut(f64, &Inputs) -> Result<Option<f64>, SubmodelError> + 'static) -> Self {
        self.init = Box::new(f);
        self
    }

    pub fn on_solve(mut self, f: impl FnMut(f64, &Inputs) -> Result<Option<f64>, SubmodelError> + 'static) -> Self {
        self.solve = Box::new(f);
        self
    }

    pub fn on_boundary(
        mut self,
        f: impl FnMut(f64, Option<f64>, &Inputs) -> Result<Option<f64>, SubmodelError> + 'static,
    ) -> Self {
        self.boundary = Box::new(f);
        self
    }

    pub fn intermediate(mut self, observations: &[(&str, Payload)]) -> Self {
        self.intermediate = to_observations(observations);
        self
    }

    pub fn final_state(mut self, observations: &[(&str, Payload)]) -> Self {
        self.final_state = to_observations(observations);
        self
    }

    /// Share the call log with the test.
    pub fn log(&self) -> CallLog {
        Rc::clone(&self.log)
    }
}

fn to_observations(observations: &[(&str, Payload)]) -> Observations {
    observations
        .iter()
        .map(|(name, p)| (name.to_string(), p.clone()))
        .collect()
}

fn names(inputs: &Inputs) -> Vec<String> {
    inputs.keys().cloned().collect()
}

impl Submodel for Scripted {
    fn describe(&self) -> SubmodelDescription {
        SubmodelDescription {
            endpoints: self.endpoints.clone(),
            ..SubmodelDescription::new(0)
        }
    }

    fn initialise_state(
        &mut self,
        configuration: &Configuration,
        initial_event: f64,
        inputs: &Inputs,
    ) -> Result<Option<f64>, SubmodelError> {
        self.log.borrow_mut().push(Call::Init {
            event: initial_event,
            inputs: names(inputs),
            configuration: configuration.clone(),
        });
        (self.init)(initial_event, inputs)
    }

    fn solve(&mut self, event: f64, inputs: &Inputs) -> Result<Option<f64>, SubmodelError> {
        self.log.borrow_mut().push(Call::Solve {
            event,
            inputs: names(inputs),
        });
        (self.solve)(event, inputs)
    }

    fn update_boundary_conditions(
        &mut self,
        event: f64,
        next_event: Option<f64>,
        inputs: &Inputs,
    ) -> Result<Option<f64>, SubmodelError> {
        self.log.borrow_mut().push(Call::Boundary { event, next_event });
        (self.boundary)(event, next_event, inputs)
    }

    fn observe_intermediate_state(&self) -> Result<Observations, SubmodelError> {
        self.log.borrow_mut().push(Call::Intermediate);
        Ok(self.intermediate.clone())
    }

    fn observe_final_state(&self) -> Result<Observations, SubmodelError> {
        self.log.borrow_mut().push(Call::Final);
        Ok(self.final_state.clone())
    }
}
