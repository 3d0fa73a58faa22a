//! Descriptions consumed once when the execution graph is built.

use crate::operator::Endpoint;
use crate::submodel::{Submodel, SubmodelKind};

/// One simulated component: a name, its declared endpoints, and the
/// submodel that implements it.
pub struct ComputeElement {
    pub name: String,
    pub endpoints: Vec<Endpoint>,
    pub submodel: Box<dyn Submodel>,
}

impl ComputeElement {
    /// Build an element, taking the endpoints from the submodel's description.
    pub fn new(name: impl Into<String>, submodel: Box<dyn Submodel>) -> Self {
        let endpoints = submodel.describe().endpoints;
        ComputeElement {
            name: name.into(),
            endpoints,
            submodel,
        }
    }

    /// Build an element from either kind of submodel.
    pub fn from_kind(name: impl Into<String>, kind: SubmodelKind) -> Self {
        Self::new(name, kind.into_event_driven())
    }

    /// Find a declared endpoint by name.
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

impl std::fmt::Debug for ComputeElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeElement")
            .field("name", &self.name)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

/// A message channel from a sending endpoint of one element to a
/// receiving endpoint of another.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Conduit {
    pub from_element: String,
    pub from_endpoint: Endpoint,
    pub to_element: String,
    pub to_endpoint: Endpoint,
}

impl Conduit {
    pub fn new(
        from_element: impl Into<String>,
        from_endpoint: Endpoint,
        to_element: impl Into<String>,
        to_endpoint: Endpoint,
    ) -> Self {
        Conduit {
            from_element: from_element.into(),
            from_endpoint,
            to_element: to_element.into(),
            to_endpoint,
        }
    }
}

impl std::fmt::Display for Conduit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} → {}.{}",
            self.from_element, self.from_endpoint, self.to_element, self.to_endpoint
        )
    }
}
