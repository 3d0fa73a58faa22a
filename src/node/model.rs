//! `ModelNode`: one stage of one compute element.

use crate::error::{SimulationError, SimulationResult};
use crate::message::Message;
use crate::operator::{Endpoint, Operator};

use super::id::{ElementIndex, NodeKey};
use super::inbox::{Inbox, Slots};

/// A stage instance in the execution graph.
///
/// The node does not own the submodel; all five stage nodes of an
/// element refer to it through `element`, and the graph hands it out to
/// whichever node is firing.
#[derive(Debug, Clone)]
pub struct ModelNode {
    key: NodeKey,
    element: ElementIndex,
    inbox: Inbox,
}

impl ModelNode {
    /// Create a node whose inbox holds the control slot plus one slot per
    /// endpoint of `endpoints` that sits on `operator`, for receiving
    /// stages only.
    pub fn new(
        element_name: impl Into<String>,
        element: ElementIndex,
        operator: Operator,
        endpoints: &[Endpoint],
    ) -> Self {
        let receiving = endpoints
            .iter()
            .filter(|e| operator.may_receive() && e.operator == operator)
            .map(|e| e.name.clone());

        ModelNode {
            key: NodeKey::new(element_name, operator),
            element,
            inbox: Inbox::new(receiving),
        }
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn element_name(&self) -> &str {
        &self.key.element
    }

    pub fn operator(&self) -> Operator {
        self.key.operator
    }

    pub fn element(&self) -> ElementIndex {
        self.element
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// Deliver `message` into slot `endpoint`.
    ///
    /// Returns the message it displaced, if the slot was occupied.
    pub fn post_message(&mut self, endpoint: &str, message: Message) -> SimulationResult<Option<Message>> {
        self.inbox
            .post(endpoint, message)
            .map_err(|_| SimulationError::UnknownSlot {
                node: self.key.clone(),
                endpoint: endpoint.to_string(),
            })
    }

    /// A node is runnable iff its inbox is full.
    pub fn is_runnable(&self) -> bool {
        self.inbox.is_full()
    }

    /// Take all pending messages, leaving the inbox empty.
    pub fn take_messages(&mut self) -> Slots {
        self.inbox.take()
    }
}

impl PartialEq for ModelNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ModelNode {}

impl std::hash::Hash for ModelNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Display for ModelNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.key, f)
    }
}
