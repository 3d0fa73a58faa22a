//! `Inbox`: the per-node message slots that gate runnability.

use indexmap::IndexMap;

use crate::message::Message;
use crate::operator::CONTROL_SLOT;

/// Slot contents as returned by [`Inbox::take`], in slot order.
pub type Slots = IndexMap<String, Option<Message>>;

/// A fixed set of named slots, each holding at most one pending message.
///
/// The key set is fixed when the inbox is created: the control slot
/// `""` first, then one slot per receiving endpoint. Posting never adds
/// keys and taking never removes them, so re-arming needs no template
/// copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbox {
    slots: Slots,
}

impl Inbox {
    /// Create an empty inbox with the control slot plus `endpoints`.
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut slots = Slots::new();
        slots.insert(CONTROL_SLOT.to_string(), None);
        for name in endpoints {
            slots.insert(name.into(), None);
        }
        Inbox { slots }
    }

    /// Put `message` into slot `endpoint`.
    ///
    /// Returns `Err(message)` if there is no such slot. On success,
    /// returns whatever the slot held before (normally `None`).
    pub fn post(&mut self, endpoint: &str, message: Message) -> Result<Option<Message>, Message> {
        match self.slots.get_mut(endpoint) {
            Some(slot) => Ok(slot.replace(message)),
            None => Err(message),
        }
    }

    /// `true` iff every slot holds a message.
    pub fn is_full(&self) -> bool {
        self.slots.values().all(Option::is_some)
    }

    /// `true` iff no slot holds a message.
    pub fn is_empty(&self) -> bool {
        self.slots.values().all(Option::is_none)
    }

    /// `true` if some but not all slots hold a message.
    pub fn is_partial(&self) -> bool {
        !self.is_full() && !self.is_empty()
    }

    /// Return the current contents and reset every slot to empty.
    pub fn take(&mut self) -> Slots {
        self.slots
            .iter_mut()
            .map(|(name, slot)| (name.clone(), slot.take()))
            .collect()
    }

    /// Slot names in order, control slot first.
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn has_slot(&self, endpoint: &str) -> bool {
        self.slots.contains_key(endpoint)
    }

    /// Peek at a slot.
    pub fn get(&self, endpoint: &str) -> Option<&Message> {
        self.slots.get(endpoint).and_then(Option::as_ref)
    }

    /// Number of slots (filled or not).
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
