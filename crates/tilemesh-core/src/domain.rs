//! Attribute domains for mesh layers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The element an attribute layer stores one value for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttributeDomain {
    /// One value per vertex.
    #[default]
    Point,
    /// One value per face corner (loop).
    Corner,
}

impl fmt::Display for AttributeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeDomain::Point => write!(f, "POINT"),
            AttributeDomain::Corner => write!(f, "CORNER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_display() {
        assert_eq!(AttributeDomain::Point.to_string(), "POINT");
        assert_eq!(AttributeDomain::Corner.to_string(), "CORNER");
    }
}
