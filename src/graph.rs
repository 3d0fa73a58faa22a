//! The model execution graph.
//!
//! Every compute element contributes five stage nodes wired into the
//! Submodel Execution Loop:
//!
//! ```text
//!            __O_I        __S        __B
//!   F_INIT ───────► O_I ──────► S ──────► B
//!     ▲              ▲                    │
//!     │              └────── __O_I ───────┤
//!     │ __F_INIT                          │ __O_F
//!     └─────────────────── O_F ◄──────────┘
//! ```
//!
//! Conduits add message edges from an O_I/O_F node of one element to an
//! F_INIT/S/B node of another. Nodes are stored in construction order
//! (elements in the order given, operators in [`Operator::ALL`] order),
//! which is also the order the scheduler scans them in.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::element::{ComputeElement, Conduit};
use crate::error::ConstructionError;
use crate::node::{ElementIndex, ModelNode, NodeIndex, NodeKey};
use crate::operator::{Endpoint, Operator, CONTROL_SLOT};
use crate::submodel::Submodel;

// ── Edges ─────────────────────────────────────────────────────────────

/// What an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeKind {
    /// Between consecutive stages of one element.
    Step,
    /// The O_F → F_INIT repeat edge.
    State,
    /// A conduit between two elements.
    Message,
}

/// A directed edge with the endpoint labels used to route along it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub kind: EdgeKind,
    /// Name the sending stage uses for this edge.
    pub from_endpoint: String,
    /// Inbox slot the message lands in.
    pub to_endpoint: String,
}

// ── Graph ─────────────────────────────────────────────────────────────

struct ElementEntry {
    name: String,
    endpoints: Vec<Endpoint>,
    submodel: Box<dyn Submodel>,
}

/// Stage nodes, their edges, and the submodels they drive.
pub struct ModelExecutionGraph {
    elements: Vec<ElementEntry>,
    nodes: IndexMap<NodeKey, ModelNode>,
    edges: Vec<Edge>,
    /// Edge indices leaving each node, parallel to `nodes`.
    outgoing: Vec<Vec<usize>>,
}

impl ModelExecutionGraph {
    /// Build the graph for `elements` wired by `conduits`.
    ///
    /// Fails without returning a partial graph if an element name repeats,
    /// an endpoint name is reserved, or a conduit does not resolve to one
    /// sending and one receiving stage node.
    pub fn new(elements: Vec<ComputeElement>, conduits: &[Conduit]) -> Result<Self, ConstructionError> {
        let mut graph = ModelExecutionGraph {
            elements: Vec::with_capacity(elements.len()),
            nodes: IndexMap::with_capacity(elements.len() * Operator::ALL.len()),
            edges: Vec::new(),
            outgoing: Vec::new(),
        };

        for element in elements {
            graph.add_element(element)?;
        }
        for conduit in conduits {
            graph.add_conduit(conduit)?;
        }
        graph.warn_unconnected_receivers();

        debug!(
            elements = graph.elements.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "execution graph built"
        );
        Ok(graph)
    }

    fn add_element(&mut self, element: ComputeElement) -> Result<(), ConstructionError> {
        if self.elements.iter().any(|e| e.name == element.name) {
            return Err(ConstructionError::DuplicateElement(element.name));
        }
        if let Some(ep) = element.endpoints.iter().find(|e| e.is_reserved()) {
            return Err(ConstructionError::ReservedEndpointName {
                element: element.name.clone(),
                endpoint: ep.name.clone(),
            });
        }

        let index = ElementIndex::new(self.elements.len());
        let [f_init, o_i, s, b, o_f] = Operator::ALL
            .map(|op| self.add_node(ModelNode::new(element.name.clone(), index, op, &element.endpoints)));

        self.add_control_edge(f_init, o_i, EdgeKind::Step);
        self.add_control_edge(o_i, s, EdgeKind::Step);
        self.add_control_edge(s, b, EdgeKind::Step);
        self.add_control_edge(b, o_i, EdgeKind::Step);
        self.add_control_edge(b, o_f, EdgeKind::Step);
        self.add_control_edge(o_f, f_init, EdgeKind::State);

        debug!(element = %element.name, endpoints = element.endpoints.len(), "element added");
        self.elements.push(ElementEntry {
            name: element.name,
            endpoints: element.endpoints,
            submodel: element.submodel,
        });
        Ok(())
    }

    fn add_node(&mut self, node: ModelNode) -> NodeIndex {
        let index = NodeIndex::new(self.nodes.len());
        self.nodes.insert(node.key().clone(), node);
        self.outgoing.push(Vec::new());
        index
    }

    /// Internal edge into `to`, labelled with `to`'s control endpoint.
    fn add_control_edge(&mut self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) {
        let label = self.node(to).operator().control_endpoint();
        self.add_edge(Edge {
            from,
            to,
            kind,
            from_endpoint: label.to_string(),
            to_endpoint: CONTROL_SLOT.to_string(),
        });
    }

    fn add_edge(&mut self, edge: Edge) {
        self.outgoing[edge.from.raw()].push(self.edges.len());
        self.edges.push(edge);
    }

    fn add_conduit(&mut self, conduit: &Conduit) -> Result<(), ConstructionError> {
        let from = &conduit.from_endpoint;
        let to = &conduit.to_endpoint;

        self.check_declared(&conduit.from_element, from)?;
        self.check_declared(&conduit.to_element, to)?;

        if !from.operator.may_send() {
            return Err(ConstructionError::NotASender {
                element: conduit.from_element.clone(),
                endpoint: from.name.clone(),
                operator: from.operator,
            });
        }
        if !to.operator.may_receive() {
            return Err(ConstructionError::NotAReceiver {
                element: conduit.to_element.clone(),
                endpoint: to.name.clone(),
                operator: to.operator,
            });
        }

        let sender = self.resolve_node(&conduit.from_element, from.operator)?;
        let receiver = self.resolve_node(&conduit.to_element, to.operator)?;

        if self.find_receiver(sender, &from.name).is_some() {
            return Err(ConstructionError::DuplicateSender {
                element: conduit.from_element.clone(),
                endpoint: from.name.clone(),
            });
        }
        if self
            .edges
            .iter()
            .any(|e| e.to == receiver && e.to_endpoint == to.name)
        {
            return Err(ConstructionError::DuplicateReceiver {
                element: conduit.to_element.clone(),
                endpoint: to.name.clone(),
            });
        }

        debug!(%conduit, "conduit added");
        self.add_edge(Edge {
            from: sender,
            to: receiver,
            kind: EdgeKind::Message,
            from_endpoint: from.name.clone(),
            to_endpoint: to.name.clone(),
        });
        Ok(())
    }

    fn check_declared(&self, element: &str, endpoint: &Endpoint) -> Result<(), ConstructionError> {
        let entry = self
            .elements
            .iter()
            .find(|e| e.name == element)
            .ok_or_else(|| ConstructionError::UnknownElement(element.to_string()))?;
        if !entry.endpoints.contains(endpoint) {
            return Err(ConstructionError::UnknownEndpoint {
                element: element.to_string(),
                endpoint: endpoint.name.clone(),
            });
        }
        Ok(())
    }

    /// Find the single node for `(element, operator)`.
    fn resolve_node(&self, element: &str, operator: Operator) -> Result<NodeIndex, ConstructionError> {
        let matches: Vec<usize> = self
            .nodes
            .keys()
            .enumerate()
            .filter(|(_, k)| k.element == element && k.operator == operator)
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [one] => Ok(NodeIndex::new(*one)),
            _ => Err(ConstructionError::NodeResolution {
                element: element.to_string(),
                operator,
                matches: matches.len(),
            }),
        }
    }

    fn warn_unconnected_receivers(&self) {
        for (i, node) in self.nodes.values().enumerate() {
            for slot in node.inbox().slot_names().filter(|s| *s != CONTROL_SLOT) {
                let fed = self
                    .edges
                    .iter()
                    .any(|e| e.to.raw() == i && e.to_endpoint == slot);
                if !fed {
                    warn!(node = %node.key(), endpoint = slot, "receiving endpoint has no conduit, node will never fire");
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Resolve where a message sent by `node` on `sending_endpoint` goes.
    ///
    /// Returns the receiving node and the inbox slot to post into, or
    /// `None` if `node` has no outgoing edge with that label.
    pub fn find_receiver(&self, node: NodeIndex, sending_endpoint: &str) -> Option<(NodeIndex, &str)> {
        self.outgoing
            .get(node.raw())?
            .iter()
            .map(|&e| &self.edges[e])
            .find(|e| e.from_endpoint == sending_endpoint)
            .map(|e| (e.to, e.to_endpoint.as_str()))
    }

    /// Whether `node`'s element declares `endpoint` on `node`'s operator.
    pub fn declares_endpoint(&self, node: NodeIndex, endpoint: &str) -> bool {
        let node = self.node(node);
        self.elements[node.element().raw()]
            .endpoints
            .iter()
            .any(|e| e.operator == node.operator() && e.name == endpoint)
    }

    /// Look up a node by identity.
    pub fn node_index(&self, element: &str, operator: Operator) -> Option<NodeIndex> {
        self.nodes
            .get_index_of(&NodeKey::new(element, operator))
            .map(NodeIndex::new)
    }

    /// # Panics
    /// Panics if `index` did not come from this graph.
    pub fn node(&self, index: NodeIndex) -> &ModelNode {
        &self.nodes[index.raw()]
    }

    /// # Panics
    /// Panics if `index` did not come from this graph.
    pub fn node_mut(&mut self, index: NodeIndex) -> &mut ModelNode {
        &mut self.nodes[index.raw()]
    }

    /// All nodes in construction order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &ModelNode)> {
        self.nodes
            .values()
            .enumerate()
            .map(|(i, n)| (NodeIndex::new(i), n))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges leaving `node`, in insertion order.
    pub fn outgoing(&self, node: NodeIndex) -> impl Iterator<Item = &Edge> {
        self.outgoing[node.raw()].iter().map(|&e| &self.edges[e])
    }

    /// Nodes directly reachable from `node`.
    pub fn neighbors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.outgoing(node).map(|e| e.to)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Element names in construction order.
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.name.as_str())
    }

    pub fn has_element(&self, name: &str) -> bool {
        self.elements.iter().any(|e| e.name == name)
    }

    /// The submodel driven by the nodes of `element`.
    pub fn submodel_mut(&mut self, element: ElementIndex) -> &mut dyn Submodel {
        self.elements[element.raw()].submodel.as_mut()
    }
}

impl std::fmt::Debug for ModelExecutionGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelExecutionGraph")
            .field("elements", &self.elements.iter().map(|e| &e.name).collect::<Vec<_>>())
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Scripted;

    fn element(name: &str, endpoints: &[(Operator, &str)]) -> ComputeElement {
        ComputeElement::new(name, Box::new(Scripted::new().with_endpoints(endpoints)))
    }

    fn conduit(from: &str, from_op: Operator, from_ep: &str, to: &str, to_op: Operator, to_ep: &str) -> Conduit {
        Conduit::new(from, Endpoint::new(from_op, from_ep), to, Endpoint::new(to_op, to_ep))
    }

    fn pair() -> Vec<ComputeElement> {
        vec![
            element("a", &[(Operator::OI, "out"), (Operator::OF, "final")]),
            element("b", &[(Operator::FInit, "in"), (Operator::S, "s_in")]),
        ]
    }

    #[test]
    fn test_five_nodes_and_six_internal_edges_per_element() {
        for n in 0..5 {
            let elements = (0..n).map(|i| element(&format!("e{}", i), &[])).collect();
            let graph = ModelExecutionGraph::new(elements, &[]).unwrap();
            assert_eq!(graph.element_count(), n);
            assert_eq!(graph.node_count(), 5 * n);
            assert_eq!(graph.edge_count(), 6 * n);
            assert_eq!(
                graph.edges().iter().filter(|e| e.kind == EdgeKind::Step).count(),
                5 * n
            );
            assert_eq!(
                graph.edges().iter().filter(|e| e.kind == EdgeKind::State).count(),
                n
            );
        }
    }

    #[test]
    fn test_internal_edges_per_element_with_conduits() {
        let graph = ModelExecutionGraph::new(
            pair(),
            &[
                conduit("a", Operator::OI, "out", "b", Operator::FInit, "in"),
                conduit("a", Operator::OF, "final", "b", Operator::S, "s_in"),
            ],
        )
        .unwrap();
        let internal = graph
            .edges()
            .iter()
            .filter(|e| e.kind != EdgeKind::Message)
            .count();
        assert_eq!(internal, 12);
        assert_eq!(graph.edge_count(), 14);
    }

    #[test]
    fn test_nodes_in_construction_order() {
        let graph = ModelExecutionGraph::new(pair(), &[]).unwrap();
        let keys: Vec<String> = graph.nodes().map(|(_, n)| n.key().to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "a.F_INIT", "a.O_I", "a.S", "a.B", "a.O_F",
                "b.F_INIT", "b.O_I", "b.S", "b.B", "b.O_F",
            ]
        );
    }

    #[test]
    fn test_step_cycle_labels() {
        let graph = ModelExecutionGraph::new(pair(), &[]).unwrap();
        let at = |op| graph.node_index("a", op).unwrap();

        assert_eq!(graph.find_receiver(at(Operator::FInit), "__O_I"), Some((at(Operator::OI), "")));
        assert_eq!(graph.find_receiver(at(Operator::OI), "__S"), Some((at(Operator::S), "")));
        assert_eq!(graph.find_receiver(at(Operator::S), "__B"), Some((at(Operator::B), "")));
        assert_eq!(graph.find_receiver(at(Operator::B), "__O_I"), Some((at(Operator::OI), "")));
        assert_eq!(graph.find_receiver(at(Operator::B), "__O_F"), Some((at(Operator::OF), "")));
        assert_eq!(graph.find_receiver(at(Operator::OF), "__F_INIT"), Some((at(Operator::FInit), "")));

        let state: Vec<&Edge> = graph.outgoing(at(Operator::OF)).collect();
        assert_eq!(state.len(), 1);
        assert_eq!(state[0].kind, EdgeKind::State);
        assert_eq!(graph.neighbors(at(Operator::B)).collect::<Vec<_>>(), vec![at(Operator::OI), at(Operator::OF)]);
    }

    #[test]
    fn test_conduit_becomes_message_edge() {
        let graph = ModelExecutionGraph::new(
            pair(),
            &[conduit("a", Operator::OI, "out", "b", Operator::FInit, "in")],
        )
        .unwrap();
        let a_oi = graph.node_index("a", Operator::OI).unwrap();
        let b_init = graph.node_index("b", Operator::FInit).unwrap();

        assert_eq!(graph.find_receiver(a_oi, "out"), Some((b_init, "in")));
        assert_eq!(graph.find_receiver(a_oi, "missing"), None);

        let edge = graph.outgoing(a_oi).find(|e| e.kind == EdgeKind::Message).unwrap();
        assert_eq!(edge.to, b_init);
        assert_eq!(edge.from_endpoint, "out");
        assert_eq!(edge.to_endpoint, "in");
    }

    #[test]
    fn test_inboxes_sized_from_receiving_endpoints() {
        let graph = ModelExecutionGraph::new(pair(), &[]).unwrap();
        let slots = |el: &str, op| {
            let n = graph.node(graph.node_index(el, op).unwrap());
            n.inbox().slot_names().map(str::to_string).collect::<Vec<_>>()
        };
        assert_eq!(slots("b", Operator::FInit), vec!["", "in"]);
        assert_eq!(slots("b", Operator::S), vec!["", "s_in"]);
        assert_eq!(slots("b", Operator::B), vec![""]);
        assert_eq!(slots("a", Operator::OI), vec![""]);
    }

    #[test]
    fn test_unknown_element_fails() {
        let err = ModelExecutionGraph::new(
            pair(),
            &[conduit("a", Operator::OI, "out", "ghost", Operator::FInit, "in")],
        )
        .unwrap_err();
        assert_eq!(err, ConstructionError::UnknownElement("ghost".into()));
    }

    #[test]
    fn test_unknown_endpoint_fails() {
        let err = ModelExecutionGraph::new(
            pair(),
            &[conduit("a", Operator::OI, "nope", "b", Operator::FInit, "in")],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::UnknownEndpoint {
                element: "a".into(),
                endpoint: "nope".into(),
            }
        );
    }

    #[test]
    fn test_endpoint_on_wrong_operator_is_unknown() {
        // `in` exists on b, but on F_INIT, not S.
        let err = ModelExecutionGraph::new(
            pair(),
            &[conduit("a", Operator::OI, "out", "b", Operator::S, "in")],
        )
        .unwrap_err();
        assert!(matches!(err, ConstructionError::UnknownEndpoint { .. }));
    }

    #[test]
    fn test_sender_must_be_observation_stage() {
        let elements = vec![
            element("a", &[(Operator::S, "x")]),
            element("b", &[(Operator::FInit, "in")]),
        ];
        let err = ModelExecutionGraph::new(
            elements,
            &[conduit("a", Operator::S, "x", "b", Operator::FInit, "in")],
        )
        .unwrap_err();
        assert!(matches!(err, ConstructionError::NotASender { operator: Operator::S, .. }));
    }

    #[test]
    fn test_receiver_must_be_receiving_stage() {
        let elements = vec![
            element("a", &[(Operator::OI, "out")]),
            element("b", &[(Operator::OF, "o")]),
        ];
        let err = ModelExecutionGraph::new(
            elements,
            &[conduit("a", Operator::OI, "out", "b", Operator::OF, "o")],
        )
        .unwrap_err();
        assert!(matches!(err, ConstructionError::NotAReceiver { operator: Operator::OF, .. }));
    }

    #[test]
    fn test_duplicate_element_fails() {
        let elements = vec![element("a", &[]), element("a", &[])];
        let err = ModelExecutionGraph::new(elements, &[]).unwrap_err();
        assert_eq!(err, ConstructionError::DuplicateElement("a".into()));
    }

    #[test]
    fn test_reserved_endpoint_name_fails() {
        let elements = vec![element("a", &[(Operator::S, "__S")])];
        let err = ModelExecutionGraph::new(elements, &[]).unwrap_err();
        assert!(matches!(err, ConstructionError::ReservedEndpointName { .. }));
    }

    #[test]
    fn test_fan_out_and_fan_in_are_rejected() {
        let elements = vec![
            element("a", &[(Operator::OI, "out")]),
            element("b", &[(Operator::FInit, "in"), (Operator::S, "s_in")]),
            element("c", &[(Operator::OI, "out")]),
        ];
        let err = ModelExecutionGraph::new(
            elements,
            &[
                conduit("a", Operator::OI, "out", "b", Operator::FInit, "in"),
                conduit("a", Operator::OI, "out", "b", Operator::S, "s_in"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateSender { .. }));

        let elements = vec![
            element("a", &[(Operator::OI, "out")]),
            element("b", &[(Operator::FInit, "in")]),
            element("c", &[(Operator::OI, "out")]),
        ];
        let err = ModelExecutionGraph::new(
            elements,
            &[
                conduit("a", Operator::OI, "out", "b", Operator::FInit, "in"),
                conduit("c", Operator::OI, "out", "b", Operator::FInit, "in"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateReceiver { .. }));
    }

    #[test]
    fn test_declares_endpoint() {
        let graph = ModelExecutionGraph::new(pair(), &[]).unwrap();
        let a_oi = graph.node_index("a", Operator::OI).unwrap();
        let a_of = graph.node_index("a", Operator::OF).unwrap();
        assert!(graph.declares_endpoint(a_oi, "out"));
        assert!(!graph.declares_endpoint(a_oi, "final"));
        assert!(graph.declares_endpoint(a_of, "final"));
    }

    #[test]
    fn test_self_coupling_is_allowed() {
        let elements = vec![element("a", &[(Operator::OF, "state"), (Operator::FInit, "prev")])];
        let graph = ModelExecutionGraph::new(
            elements,
            &[conduit("a", Operator::OF, "state", "a", Operator::FInit, "prev")],
        )
        .unwrap();
        assert_eq!(graph.edge_count(), 7);
    }
}
