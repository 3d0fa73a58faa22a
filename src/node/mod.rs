//! Stage nodes of the execution graph.
//!
//! Each compute element is represented by five nodes, one per operator.
//! A node fires when its inbox is full; firing takes the inbox, which
//! re-arms it for the next round.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`NodeKey`], [`NodeIndex`], [`ElementIndex`] |
//! | [`inbox`] | [`Inbox`], [`Slots`] |
//! | [`model`] | [`ModelNode`] |

pub mod id;
pub mod inbox;
pub mod model;

pub use id::{ElementIndex, NodeIndex, NodeKey};
pub use inbox::{Inbox, Slots};
pub use model::ModelNode;
