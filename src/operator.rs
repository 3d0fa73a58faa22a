//! Protocol stages and communication endpoints.
//!
//! Every compute element passes through the same five stages (the
//! Submodel Execution Loop). Receiving stages accept conduit messages,
//! sending stages emit observations over conduits.

/// Inbox key of the control slot present on every stage node.
pub const CONTROL_SLOT: &str = "";

/// Prefix reserved for the labels of step and state edges.
pub const CONTROL_PREFIX: &str = "__";

// ── Operator ──────────────────────────────────────────────────────────

/// One of the five fixed stages of the Submodel Execution Loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Operator {
    /// Initialise state for this event.
    FInit,
    /// Observe intermediate state.
    OI,
    /// Solve up to the next event.
    S,
    /// Update boundary conditions, decide whether to continue.
    B,
    /// Observe final state.
    OF,
}

impl Operator {
    /// All operators, in the order their nodes are created.
    pub const ALL: [Operator; 5] = [
        Operator::FInit,
        Operator::OI,
        Operator::S,
        Operator::B,
        Operator::OF,
    ];

    /// Whether this stage accepts messages over conduits.
    pub fn may_receive(self) -> bool {
        matches!(self, Operator::FInit | Operator::S | Operator::B)
    }

    /// Whether this stage emits messages over conduits.
    pub fn may_send(self) -> bool {
        matches!(self, Operator::OI | Operator::OF)
    }

    /// Canonical short name.
    pub fn name(self) -> &'static str {
        match self {
            Operator::FInit => "F_INIT",
            Operator::OI => "O_I",
            Operator::S => "S",
            Operator::B => "B",
            Operator::OF => "O_F",
        }
    }

    /// Label of the internal edge leading into this stage, e.g. `__O_I`.
    ///
    /// Stage transitions address their successor by this name; the
    /// graph stores it as the sending label of the step or state edge.
    pub fn control_endpoint(self) -> &'static str {
        match self {
            Operator::FInit => "__F_INIT",
            Operator::OI => "__O_I",
            Operator::S => "__S",
            Operator::B => "__B",
            Operator::OF => "__O_F",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Endpoint ──────────────────────────────────────────────────────────

/// A named communication port attached to one stage of a compute element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Endpoint {
    pub operator: Operator,
    pub name: String,
}

impl Endpoint {
    pub fn new(operator: Operator, name: impl Into<String>) -> Self {
        Endpoint {
            operator,
            name: name.into(),
        }
    }

    /// Whether the name clashes with the control slot or a control label.
    pub fn is_reserved(&self) -> bool {
        self.name == CONTROL_SLOT || self.name.starts_with(CONTROL_PREFIX)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.operator)
    }
}
