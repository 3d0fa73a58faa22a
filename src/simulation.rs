//! Simulation builder.
//!
//! Collects compute elements, conduits and configurations by name, then
//! builds the execution graph and hands it to the engine. Conduit
//! endpoints and configuration parameters are checked against each
//! submodel's description as they are added.

use std::collections::BTreeMap;

use tracing::debug;

use crate::configuration::{merge_configuration, Configuration, Configurations};
use crate::element::{ComputeElement, Conduit};
use crate::error::{ConstructionError, SimulationResult};
use crate::graph::ModelExecutionGraph;
use crate::scheduler::{RunSummary, SimulationEngine};
use crate::submodel::{Submodel, SubmodelDescription, SubmodelKind, TimeDrivenSubmodel};

/// Top-level simulation description.
///
/// Every element added starts with a default configuration, which
/// `set_configuration` replaces and `update_configuration` overlays.
#[derive(Debug, Default)]
pub struct Simulation {
    elements: Vec<ComputeElement>,
    descriptions: BTreeMap<String, SubmodelDescription>,
    conduits: Vec<Conduit>,
    configurations: Configurations,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event-driven submodel as element `name`.
    pub fn add_submodel(
        &mut self,
        name: impl Into<String>,
        model: impl Submodel + 'static,
    ) -> Result<&mut Self, ConstructionError> {
        self.add_element(name, SubmodelKind::event_driven(model))
    }

    /// Add a time-driven submodel as element `name`.
    pub fn add_time_driven_submodel(
        &mut self,
        name: impl Into<String>,
        model: impl TimeDrivenSubmodel + 'static,
    ) -> Result<&mut Self, ConstructionError> {
        self.add_element(name, SubmodelKind::time_driven(model))
    }

    pub fn add_element(&mut self, name: impl Into<String>, kind: SubmodelKind) -> Result<&mut Self, ConstructionError> {
        let name = name.into();
        if self.descriptions.contains_key(&name) {
            return Err(ConstructionError::DuplicateElement(name));
        }

        let description = kind.describe();
        debug!(element = %name, ?kind, endpoints = description.endpoints.len(), "element declared");
        self.elements.push(ComputeElement::from_kind(name.clone(), kind));
        self.descriptions.insert(name.clone(), description);
        self.configurations.insert(name, Configuration::default());
        Ok(self)
    }

    /// Connect `from_element.from_endpoint` to `to_element.to_endpoint`.
    ///
    /// Endpoint names are looked up in each submodel's description, which
    /// also fixes the stage they belong to.
    pub fn add_conduit(
        &mut self,
        from_element: &str,
        from_endpoint: &str,
        to_element: &str,
        to_endpoint: &str,
    ) -> Result<&mut Self, ConstructionError> {
        let from = self.lookup_endpoint(from_element, from_endpoint)?;
        let to = self.lookup_endpoint(to_element, to_endpoint)?;
        self.conduits
            .push(Conduit::new(from_element, from, to_element, to));
        Ok(self)
    }

    fn lookup_endpoint(&self, element: &str, endpoint: &str) -> Result<crate::operator::Endpoint, ConstructionError> {
        let description = self.description(element)?;
        description
            .endpoint(endpoint)
            .cloned()
            .ok_or_else(|| ConstructionError::UnknownEndpoint {
                element: element.to_string(),
                endpoint: endpoint.to_string(),
            })
    }

    fn description(&self, element: &str) -> Result<&SubmodelDescription, ConstructionError> {
        self.descriptions
            .get(element)
            .ok_or_else(|| ConstructionError::UnknownElement(element.to_string()))
    }

    /// Replace the configuration of `element`.
    pub fn set_configuration(
        &mut self,
        element: &str,
        configuration: Configuration,
    ) -> Result<&mut Self, ConstructionError> {
        self.description(element)?
            .check_parameters(element, &configuration.parameters)?;
        self.configurations
            .insert(element.to_string(), configuration);
        Ok(self)
    }

    /// Overlay `overriding` on the current configuration of `element`.
    pub fn update_configuration(
        &mut self,
        element: &str,
        overriding: &Configuration,
    ) -> Result<&mut Self, ConstructionError> {
        let merged = match self.configurations.get(element) {
            Some(base) => merge_configuration(base, overriding),
            None => return Err(ConstructionError::UnknownElement(element.to_string())),
        };
        self.set_configuration(element, merged)
    }

    pub fn configuration(&self, element: &str) -> Option<&Configuration> {
        self.configurations.get(element)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn conduit_count(&self) -> usize {
        self.conduits.len()
    }

    /// Build the execution graph and return it with the configurations.
    pub fn build(self) -> Result<(ModelExecutionGraph, Configurations), ConstructionError> {
        let graph = ModelExecutionGraph::new(self.elements, &self.conduits)?;
        Ok((graph, self.configurations))
    }

    /// Build and seed an engine without running it.
    pub fn into_engine(self) -> SimulationResult<SimulationEngine> {
        let (graph, configurations) = self.build()?;
        SimulationEngine::new(graph, configurations)
    }

    /// Build and run to completion.
    pub fn run(self) -> SimulationResult<RunSummary> {
        self.into_engine()?.run()
    }
}
