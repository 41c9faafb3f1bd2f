//! Error types for tilemesh-core.

use crate::domain::AttributeDomain;
use thiserror::Error;

/// Errors that abort a mesh editing operator before it mutates anything.
///
/// Conditions that only make an operator a no-op (an empty selection, a
/// rotation by a multiple of four quarter turns) are not errors; operators
/// report those as cancelled runs instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Wrong object type or wrong editor mode for the operator.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The UV layer the operator works on does not exist.
    #[error("{}", missing_uv_message(.0))]
    MissingUvLayer(Option<String>),

    /// A named color layer does not exist.
    #[error("color layer not found: {0}")]
    MissingColorLayer(String),

    /// The mesh has no active color layer.
    #[error("no active color layer")]
    NoActiveColorLayer,

    /// The color layer lives on a domain the operator cannot handle.
    #[error("unsupported color domain {domain} on layer '{layer}'")]
    UnsupportedDomain {
        /// Layer name.
        layer: String,
        /// Domain of the layer.
        domain: AttributeDomain,
    },

    /// An existing layer has a different data type or domain than required.
    #[error("layer '{layer}' exists but is not a {expected} layer")]
    LayerTypeMismatch {
        /// Layer name.
        layer: String,
        /// Description of the required layer kind.
        expected: String,
    },

    /// Two layers that must share a domain do not.
    #[error("color layer domains do not match: {a} vs {b}")]
    DomainMismatch {
        /// Domain of the first layer.
        a: AttributeDomain,
        /// Domain of the second layer.
        b: AttributeDomain,
    },

    /// A parameter is outside its valid range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl EditError {
    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

fn missing_uv_message(name: &Option<String>) -> String {
    match name {
        Some(name) => format!("UV layer not found: {name}"),
        None => "no active UV layer".to_string(),
    }
}
