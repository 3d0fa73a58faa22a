//! Stage transitions of the Submodel Execution Loop.
//!
//! Each function consumes the full inbox of one stage node, calls the
//! submodel, and returns what the stage sends: observations over
//! conduits and one control message to the next stage of the same
//! element (or none, when O_F ends a loop that will not repeat).
//!
//! The control message carries `(cur_event, next_event, repeat)` as
//! `(time, next_time, Flag(repeat))`.

use crate::configuration::Configuration;
use crate::error::{SimulationError, SimulationResult, SubmodelError};
use crate::message::Message;
use crate::node::{NodeKey, Slots};
use crate::operator::{Operator, CONTROL_SLOT};
use crate::submodel::{Inputs, Observations, Submodel};

/// The event state a stage fired with and the messages it produced.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StageOutput {
    pub cur_event: f64,
    pub next_event: Option<f64>,
    pub repeat: bool,
    /// `(sending endpoint, message)` in send order, control message last.
    pub messages: Vec<(String, Message)>,
}

/// The state threaded through an element's loop.
#[derive(Debug, Clone, Copy)]
struct Control {
    cur_event: f64,
    next_event: Option<f64>,
    repeat: bool,
}

impl Control {
    fn to(self, operator: Operator) -> (String, Message) {
        (
            operator.control_endpoint().to_string(),
            Message::control(self.cur_event, self.next_event, self.repeat),
        )
    }

    fn output(self, mut messages: Vec<(String, Message)>, next: Option<Operator>) -> StageOutput {
        if let Some(op) = next {
            messages.push(self.to(op));
        }
        StageOutput {
            cur_event: self.cur_event,
            next_event: self.next_event,
            repeat: self.repeat,
            messages,
        }
    }
}

/// Fire the stage `node` against `submodel` with the taken inbox `slots`.
///
/// `configuration` is only consulted by F_INIT.
pub(crate) fn fire(
    node: &NodeKey,
    submodel: &mut dyn Submodel,
    configuration: &Configuration,
    slots: Slots,
) -> SimulationResult<StageOutput> {
    let (control, inputs) = split_control(node, slots)?;
    let fail = |source: SubmodelError| SimulationError::Submodel {
        node: node.clone(),
        source,
    };

    match node.operator {
        Operator::FInit => {
            let repeat = will_repeat(&inputs);
            let cur_event = initial_event(&inputs);
            let next_event = submodel
                .initialise_state(configuration, cur_event, &inputs)
                .map_err(fail)?;
            let state = Control {
                cur_event,
                next_event,
                repeat,
            };
            Ok(state.output(Vec::new(), Some(Operator::OI)))
        }

        Operator::OI => {
            let state = read_control(node, &control)?;
            let observations = submodel.observe_intermediate_state().map_err(fail)?;
            Ok(state.output(wrap(&state, observations), Some(Operator::S)))
        }

        Operator::S => {
            let mut state = read_control(node, &control)?;
            // With no next event scheduled, solve at the current one.
            state.cur_event = state.next_event.unwrap_or(state.cur_event);
            state.next_event = submodel.solve(state.cur_event, &inputs).map_err(fail)?;
            Ok(state.output(Vec::new(), Some(Operator::B)))
        }

        Operator::B => {
            let mut state = read_control(node, &control)?;
            state.next_event = submodel
                .update_boundary_conditions(state.cur_event, state.next_event, &inputs)
                .map_err(fail)?;
            let next = if state.next_event.is_some() {
                Operator::OI
            } else {
                Operator::OF
            };
            Ok(state.output(Vec::new(), Some(next)))
        }

        Operator::OF => {
            let state = read_control(node, &control)?;
            let observations = submodel.observe_final_state().map_err(fail)?;
            let next = state.repeat.then_some(Operator::FInit);
            Ok(state.output(wrap(&state, observations), next))
        }
    }
}

/// Separate the control message from the named inputs.
fn split_control(node: &NodeKey, slots: Slots) -> SimulationResult<(Message, Inputs)> {
    let mut control = None;
    let mut inputs = Inputs::new();
    for (name, message) in slots {
        let message = message.ok_or_else(|| SimulationError::IncompleteInbox {
            node: node.clone(),
            endpoint: name.clone(),
        })?;
        if name == CONTROL_SLOT {
            control = Some(message);
        } else {
            inputs.insert(name, message);
        }
    }
    let control = control.ok_or_else(|| SimulationError::MalformedControl { node: node.clone() })?;
    Ok((control, inputs))
}

fn read_control(node: &NodeKey, message: &Message) -> SimulationResult<Control> {
    let repeat = message
        .payload()
        .as_flag()
        .ok_or_else(|| SimulationError::MalformedControl { node: node.clone() })?;
    Ok(Control {
        cur_event: message.time(),
        next_event: message.next_time(),
        repeat,
    })
}

/// An element repeats iff it received at least one input and every
/// input still announced a next event.
fn will_repeat(inputs: &Inputs) -> bool {
    !inputs.is_empty() && inputs.values().all(|m| m.next_time().is_some())
}

/// The latest input time, never earlier than zero.
fn initial_event(inputs: &Inputs) -> f64 {
    inputs.values().map(Message::time).fold(0.0, f64::max)
}

fn wrap(state: &Control, observations: Observations) -> Vec<(String, Message)> {
    observations
        .into_iter()
        .map(|(name, payload)| {
            (name, Message::new(state.cur_event, state.next_event, payload))
        })
        .collect()
}
