//! Per-element configuration.
//!
//! The engine forwards a [`Configuration`] verbatim to the element's
//! `initialise_state`. Only the time-driven adapter looks inside it (for
//! the time scale); everything else is for the submodel to interpret.

use std::collections::BTreeMap;

// ── Scale ─────────────────────────────────────────────────────────────

/// Resolution and size of one dimension (time or a spatial axis).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Scale {
    /// Step size.
    pub grain: f64,
    /// Total length covered.
    pub extent: f64,
}

impl Scale {
    pub fn new(grain: f64, extent: f64) -> Self {
        Scale { grain, extent }
    }
}

// ── Parameters ────────────────────────────────────────────────────────

/// A single model parameter value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(untagged))]
pub enum ParameterValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    /// Numeric view; integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Integer(i) => Some(*i as f64),
            ParameterValue::Float(x) => Some(*x),
            ParameterValue::Text(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParameterValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(i: i64) -> Self {
        ParameterValue::Integer(i)
    }
}

impl From<f64> for ParameterValue {
    fn from(x: f64) -> Self {
        ParameterValue::Float(x)
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        ParameterValue::Text(s.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(s: String) -> Self {
        ParameterValue::Text(s)
    }
}

/// Named parameter values, sorted by name.
pub type Parameters = BTreeMap<String, ParameterValue>;

// ── Configuration ─────────────────────────────────────────────────────

/// Settings for one compute element.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct Configuration {
    pub time_scale: Option<Scale>,
    pub space_scales: Vec<Scale>,
    pub parameters: Parameters,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_scale(mut self, grain: f64, extent: f64) -> Self {
        self.time_scale = Some(Scale::new(grain, extent));
        self
    }

    pub fn with_space_scale(mut self, grain: f64, extent: f64) -> Self {
        self.space_scales.push(Scale::new(grain, extent));
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(name)
    }

    /// Look up a numeric parameter, falling back to `default`.
    pub fn float_or(&self, name: &str, default: f64) -> f64 {
        self.parameter(name)
            .and_then(ParameterValue::as_float)
            .unwrap_or(default)
    }

    /// Parse a configuration from JSON.
    #[cfg(feature = "serialize")]
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Render the configuration as pretty-printed JSON.
    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Configurations keyed by compute-element name.
pub type Configurations = BTreeMap<String, Configuration>;

/// Overlay `overriding` on top of `base`.
///
/// Scales from `overriding` replace the base ones when they are set;
/// parameters are merged key by key with `overriding` taking precedence.
pub fn merge_configuration(base: &Configuration, overriding: &Configuration) -> Configuration {
    let time_scale = overriding.time_scale.or(base.time_scale);

    let space_scales = if overriding.space_scales.is_empty() {
        base.space_scales.clone()
    } else {
        overriding.space_scales.clone()
    };

    let mut parameters = base.parameters.clone();
    parameters.extend(
        overriding
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    Configuration {
        time_scale,
        space_scales,
        parameters,
    }
}
