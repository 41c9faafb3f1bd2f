//! Vertex and face selection.
//!
//! Editing operators read the selection of the object they run on. Selections
//! are ordered index sets so operators visit faces in a stable order.

use crate::Mesh;
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents an edge as a sorted pair of vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge(pub u32, pub u32);

impl Edge {
    /// Creates an edge from two vertex indices, smaller index first.
    pub fn new(a: u32, b: u32) -> Self {
        if a < b { Edge(a, b) } else { Edge(b, a) }
    }

    /// Returns the vertex indices as a tuple.
    pub fn vertices(&self) -> (u32, u32) {
        (self.0, self.1)
    }
}

/// Selected vertices and faces of one mesh.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshSelection {
    /// Selected vertex indices.
    pub vertices: BTreeSet<u32>,
    /// Selected face indices.
    pub faces: BTreeSet<u32>,
}

impl MeshSelection {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects every vertex and face of `mesh`.
    pub fn all(mesh: &Mesh) -> Self {
        let mut selection = Self::new();
        selection.select_all(mesh);
        selection
    }

    /// Selects the given faces and their vertices.
    pub fn from_faces(mesh: &Mesh, faces: impl IntoIterator<Item = u32>) -> Self {
        let mut selection = Self::new();
        selection.faces.extend(faces);
        selection.faces_to_vertices(mesh);
        selection
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty()
    }

    /// Clears all selections.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
    }

    pub fn select_vertex(&mut self, index: u32) {
        self.vertices.insert(index);
    }

    pub fn select_face(&mut self, index: u32) {
        self.faces.insert(index);
    }

    /// Selects all vertices and faces.
    pub fn select_all(&mut self, mesh: &Mesh) {
        self.vertices = (0..mesh.vertex_count() as u32).collect();
        self.faces = (0..mesh.face_count() as u32).collect();
    }

    /// Adds the vertices of every selected face.
    pub fn faces_to_vertices(&mut self, mesh: &Mesh) {
        for &face in &self.faces {
            self.vertices.extend(mesh.face_verts(face as usize));
        }
    }
}
