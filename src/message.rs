//! Messages exchanged between protocol stages.
//!
//! A `Message` is an immutable, timestamped envelope. It is produced by
//! one stage transition and consumed by exactly one inbox slot of a
//! downstream stage node.

// ── Payload ───────────────────────────────────────────────────────────

/// Opaque data carried by a message.
///
/// Control messages between the stages of one compute element always
/// carry a `Flag` (the repeat flag). Observations sent over conduits may
/// use any variant; the engine never looks inside them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    /// A boolean, used for the repeat flag on control messages.
    Flag(bool),
    /// A single scalar value.
    Number(f64),
    /// A vector of samples (a field on a grid, a state vector, ...).
    Array(Vec<f64>),
    /// Human-readable text (convenient for examples and tests).
    Text(String),
    /// Raw bytes.
    Data(Vec<u8>),
    /// No data at all.
    Empty,
}

impl Payload {
    /// Return the flag if this is a `Flag` payload.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Payload::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Return the scalar if this is a `Number` payload.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Payload::Number(x) => Some(*x),
            _ => None,
        }
    }

    /// Return the samples if this is an `Array` payload.
    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            Payload::Array(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Flag(b)
    }
}

impl From<f64> for Payload {
    fn from(x: f64) -> Self {
        Payload::Number(x)
    }
}

impl From<Vec<f64>> for Payload {
    fn from(v: Vec<f64>) -> Self {
        Payload::Array(v)
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Flag(b) => write!(f, "Flag({})", b),
            Payload::Number(x) => write!(f, "Number({})", x),
            Payload::Array(v) => write!(f, "Array({} samples)", v.len()),
            Payload::Text(s) => {
                if s.len() > 32 {
                    let cut = s
                        .char_indices()
                        .nth(32)
                        .map(|(i, _)| i)
                        .unwrap_or(s.len());
                    write!(f, "Text(\"{}…\")", &s[..cut])
                } else {
                    write!(f, "Text({:?})", s)
                }
            }
            Payload::Data(d) => write!(f, "Data({} bytes)", d.len()),
            Payload::Empty => write!(f, "Empty"),
        }
    }
}

// ── Message ───────────────────────────────────────────────────────────

/// A timestamped envelope travelling along one edge of the execution graph.
///
/// `time` is the event the message represents. `next_time` is the event
/// the receiving stage should process next; `None` means there is no
/// further event and the stage sequence should wind down.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    time: f64,
    next_time: Option<f64>,
    payload: Payload,
}

impl Message {
    /// Create a message carrying `payload`.
    pub fn new(time: f64, next_time: Option<f64>, payload: impl Into<Payload>) -> Self {
        Message {
            time,
            next_time,
            payload: payload.into(),
        }
    }

    /// Create a control message carrying the repeat flag.
    pub fn control(time: f64, next_time: Option<f64>, repeat: bool) -> Self {
        Message::new(time, next_time, Payload::Flag(repeat))
    }

    /// The event this message represents.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The next event, if any.
    #[inline]
    pub fn next_time(&self) -> Option<f64> {
        self.next_time
    }

    /// The carried data.
    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.next_time {
            Some(next) => write!(f, "Message({}, {}, {})", self.time, next, self.payload),
            None => write!(f, "Message({}, -, {})", self.time, self.payload),
        }
    }
}
