use std::cell::RefCell;
use std::rc::Rc;

use coupler::{
    Configuration, Inputs, Observations, Operator, ParameterKind, Payload, Simulation, SimulationError,
    SubmodelDescription, SubmodelError, TimeDrivenSubmodel,
};
use tracing_subscriber::EnvFilter;

// ── Demo submodels ────────────────────────────────────────────────────

/// A well-mixed reservoir that loses heat through a wall.
///
/// Publishes its temperature every step and takes the wall flux computed
/// by the micro model in return.
struct Reservoir {
    temperature: f64,
    coupling: f64,
    history: Rc<RefCell<Vec<(f64, f64)>>>,
}

impl TimeDrivenSubmodel for Reservoir {
    fn describe(&self) -> SubmodelDescription {
        let mut d = SubmodelDescription::new(0);
        d.add_endpoint(Operator::OI, "state_out")
            .add_endpoint(Operator::S, "micro_in")
            .add_parameter("initial_temperature", ParameterKind::Float)
            .add_parameter("coupling", ParameterKind::Float);
        d
    }

    fn initialise_state(&mut self, conf: &Configuration, time: f64, _: &Inputs) -> Result<(), SubmodelError> {
        self.temperature = conf.float_or("initial_temperature", 80.0);
        self.coupling = conf.float_or("coupling", 0.5);
        self.history.borrow_mut().push((time, self.temperature));
        Ok(())
    }

    fn solve(&mut self, time: f64, inputs: &Inputs) -> Result<(), SubmodelError> {
        let flux = inputs
            .get("micro_in")
            .and_then(|m| m.payload().as_number())
            .ok_or_else(|| SubmodelError::InvalidInput {
                endpoint: "micro_in".into(),
                reason: "expected the wall flux as a number".into(),
            })?;
        self.temperature -= self.coupling * flux;
        self.history.borrow_mut().push((time, self.temperature));
        Ok(())
    }

    fn update_boundary_conditions(&mut self, _: f64, _: &Inputs) -> Result<(), SubmodelError> {
        Ok(())
    }

    fn has_converged(&self) -> bool {
        false
    }

    fn observe_intermediate_state(&self) -> Result<Observations, SubmodelError> {
        Ok(Observations::from([(
            "state_out".to_string(),
            Payload::Number(self.temperature),
        )]))
    }

    fn observe_final_state(&self) -> Result<Observations, SubmodelError> {
        Ok(Observations::new())
    }
}

/// The wall: relaxes towards the reservoir temperature on a fine grain.
///
/// The wall temperature persists between runs; each run reports the
/// remaining gradient as the flux.
struct Wall {
    temperature: f64,
    boundary: f64,
    rate: f64,
    dt: f64,
    tolerance: f64,
}

impl TimeDrivenSubmodel for Wall {
    fn describe(&self) -> SubmodelDescription {
        let mut d = SubmodelDescription::new(1);
        d.add_endpoint(Operator::FInit, "boundary_in")
            .add_endpoint(Operator::OF, "result")
            .add_parameter("rate", ParameterKind::Float)
            .add_parameter("tolerance", ParameterKind::Float);
        d
    }

    fn initialise_state(&mut self, conf: &Configuration, _: f64, inputs: &Inputs) -> Result<(), SubmodelError> {
        self.boundary = inputs
            .get("boundary_in")
            .and_then(|m| m.payload().as_number())
            .ok_or_else(|| SubmodelError::InvalidInput {
                endpoint: "boundary_in".into(),
                reason: "expected the reservoir temperature".into(),
            })?;
        self.rate = conf.float_or("rate", 1.0);
        self.tolerance = conf.float_or("tolerance", 0.0);
        self.dt = conf.time_scale.map(|s| s.grain).unwrap_or(0.1);
        Ok(())
    }

    fn solve(&mut self, _: f64, _: &Inputs) -> Result<(), SubmodelError> {
        self.temperature += self.rate * self.dt * (self.boundary - self.temperature);
        Ok(())
    }

    fn update_boundary_conditions(&mut self, _: f64, _: &Inputs) -> Result<(), SubmodelError> {
        Ok(())
    }

    fn has_converged(&self) -> bool {
        (self.boundary - self.temperature).abs() < self.tolerance
    }

    fn observe_intermediate_state(&self) -> Result<Observations, SubmodelError> {
        Ok(Observations::new())
    }

    fn observe_final_state(&self) -> Result<Observations, SubmodelError> {
        Ok(Observations::from([(
            "result".to_string(),
            Payload::Number(self.boundary - self.temperature),
        )]))
    }
}

// ── Demo ──────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("═══════════════════════════════════════════════════════");
    println!("  Coupler — Macro/Micro Coupling Demo");
    println!("  Reservoir (Δt = 1, T = 10) ↔ Wall (Δt = 0.1, T = 1)");
    println!("═══════════════════════════════════════════════════════");
    println!();

    if let Err(err) = run() {
        eprintln!("  ✗ Simulation failed: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), SimulationError> {
    let history = Rc::new(RefCell::new(Vec::new()));

    let mut sim = Simulation::new();
    sim.add_time_driven_submodel(
        "macro",
        Reservoir {
            temperature: 0.0,
            coupling: 0.0,
            history: Rc::clone(&history),
        },
    )?
    .add_time_driven_submodel(
        "micro",
        Wall {
            temperature: 20.0,
            boundary: 0.0,
            rate: 0.0,
            dt: 0.0,
            tolerance: 0.0,
        },
    )?
    .add_conduit("macro", "state_out", "micro", "boundary_in")?
    .add_conduit("micro", "result", "macro", "micro_in")?
    .set_configuration(
        "macro",
        Configuration::new()
            .with_time_scale(1.0, 10.0)
            .with_parameter("initial_temperature", 80.0)
            .with_parameter("coupling", 0.2),
    )?
    .set_configuration(
        "micro",
        Configuration::new()
            .with_time_scale(0.1, 1.0)
            .with_parameter("rate", 2.0)
            .with_parameter("tolerance", 0.01),
    )?;

    let mut engine = sim.into_engine()?;
    let summary = engine.run()?;

    println!("  Reservoir temperature:");
    for (time, temperature) in history.borrow().iter() {
        println!("    t = {:>4.1}  T = {:>7.3}", time, temperature);
    }
    println!();

    let micro_runs = engine
        .trace()
        .iter()
        .filter(|f| f.node.element == "micro" && f.node.operator == Operator::FInit)
        .count();
    println!("  Firings: {} total, {} micro runs", summary.steps, micro_runs);
    for key in &summary.waiting {
        println!("  Waiting at completion: {}", key);
    }
    println!();
    println!("  ✓ Coupling demo complete.");
    Ok(())
}
