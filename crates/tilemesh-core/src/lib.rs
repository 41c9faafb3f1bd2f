//! Core types shared by the tilemesh crates.
//!
//! - [`AttributeDomain`] for per-vertex and per-corner layers
//! - [`EditError`], the error taxonomy of mesh editing operators

mod domain;
mod error;

pub use domain::AttributeDomain;
pub use error::EditError;
