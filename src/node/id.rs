//! Node identity: the structural key and the positional indices.

use crate::operator::Operator;

/// Position of a stage node in the graph's construction order.
///
/// A newtype rather than a bare `usize` so node and element positions
/// cannot be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    #[inline]
    pub fn new(index: usize) -> Self {
        NodeIndex(index)
    }

    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a compute element in the graph's construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementIndex(usize);

impl ElementIndex {
    #[inline]
    pub fn new(index: usize) -> Self {
        ElementIndex(index)
    }

    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }
}

/// Identity of a stage node: `(element name, operator)`.
///
/// Two nodes are the same node iff both parts match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeKey {
    pub element: String,
    pub operator: Operator,
}

impl NodeKey {
    pub fn new(element: impl Into<String>, operator: Operator) -> Self {
        NodeKey {
            element: element.into(),
            operator,
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.element, self.operator)
    }
}
