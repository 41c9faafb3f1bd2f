//! Editable mesh object: a mesh plus its editing context.

use glam::Mat4;
use rhizome_tilemesh_core::EditError;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Mesh, MeshSelection};

/// Editor mode the object is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EditMode {
    #[default]
    Object,
    Edit,
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::Object => write!(f, "OBJECT"),
            EditMode::Edit => write!(f, "EDIT"),
        }
    }
}

/// Severity of an operator report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReportLevel {
    Info,
    Warning,
}

/// A user-facing message left by an operator run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Report {
    pub level: ReportLevel,
    pub message: String,
}

/// Result of an operator run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operator ran and may have changed the object.
    Finished,
    /// Nothing to do (empty selection, no-op parameters). Nothing changed.
    Cancelled,
}

/// An editing operator that runs against a [`MeshObject`].
///
/// Implementations check parameters and context before touching the object,
/// so an `Err` leaves it unchanged.
pub trait Operator {
    /// Runs the operator in place.
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError>;

    /// Runs the operator on a copy of `object`.
    fn apply(&self, object: &MeshObject) -> Result<MeshObject, EditError> {
        let mut result = object.clone();
        self.execute(&mut result)?;
        Ok(result)
    }
}

/// A named mesh with selection, editor mode and world transform.
#[derive(Debug, Clone)]
pub struct MeshObject {
    pub name: String,
    pub mesh: Mesh,
    pub selection: MeshSelection,
    pub mode: EditMode,
    pub matrix_world: Mat4,
    /// Reports appended by operators, oldest first.
    pub reports: Vec<Report>,
}

impl MeshObject {
    /// Wraps a mesh in object mode with an identity transform.
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            selection: MeshSelection::new(),
            mode: EditMode::Object,
            matrix_world: Mat4::IDENTITY,
            reports: Vec::new(),
        }
    }

    /// Switches to edit mode.
    pub fn with_edit_mode(mut self) -> Self {
        self.mode = EditMode::Edit;
        self
    }

    /// Replaces the selection.
    pub fn with_selection(mut self, selection: MeshSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the world transform.
    pub fn with_matrix_world(mut self, matrix: Mat4) -> Self {
        self.matrix_world = matrix;
        self
    }

    /// Fails unless the object is in edit mode.
    pub fn require_edit_mode(&self) -> Result<(), EditError> {
        if self.mode == EditMode::Edit {
            Ok(())
        } else {
            Err(EditError::InvalidSelection(format!(
                "'{}' must be in edit mode (currently {})",
                self.name, self.mode
            )))
        }
    }

    /// Index of the named UV layer, or the active one when `name` is `None`.
    pub fn uv_layer_index(&self, name: Option<&str>) -> Result<usize, EditError> {
        self.mesh
            .uv_layers
            .resolve(name)
            .ok_or_else(|| EditError::MissingUvLayer(name.map(str::to_string)))
    }

    /// Index of the active color layer.
    pub fn active_color_layer_index(&self) -> Result<usize, EditError> {
        self.mesh
            .color_layers
            .active_index()
            .ok_or(EditError::NoActiveColorLayer)
    }

    /// Selected faces that exist in the mesh, ascending.
    pub fn selected_faces(&self) -> Vec<u32> {
        let count = self.mesh.face_count() as u32;
        self.selection
            .faces
            .iter()
            .copied()
            .filter(|&f| f < count)
            .collect()
    }

    /// Selected vertices that exist in the mesh, ascending.
    pub fn selected_vertices(&self) -> Vec<u32> {
        let count = self.mesh.vertex_count() as u32;
        self.selection
            .vertices
            .iter()
            .copied()
            .filter(|&v| v < count)
            .collect()
    }

    pub fn report(&mut self, level: ReportLevel, message: impl Into<String>) {
        self.reports.push(Report {
            level,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.report(ReportLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.report(ReportLevel::Warning, message);
    }

    /// Records a warning and returns [`Outcome::Cancelled`].
    pub fn cancel(&mut self, message: &str) -> Outcome {
        tracing::warn!(object = %self.name, "{message}");
        self.warn(message);
        Outcome::Cancelled
    }

    /// The most recent report.
    pub fn last_report(&self) -> Option<&Report> {
        self.reports.last()
    }
}
