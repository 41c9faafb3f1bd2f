//! Core mesh type.

use glam::Vec3;
use std::collections::BTreeSet;
use std::ops::Range;

use crate::layers::{ColorLayer, LayerSet, UvLayer};
use crate::selection::Edge;

/// A polygon mesh with n-gon faces and named per-corner / per-point layers.
///
/// Face `f` owns the loops `face_offsets[f]..face_offsets[f + 1]`, so the
/// corners of one face are contiguous in `corner_verts` and in every
/// corner-domain layer.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Loop to vertex mapping.
    pub corner_verts: Vec<u32>,
    /// Loop start of each face, followed by the total loop count.
    pub face_offsets: Vec<u32>,
    /// UV layers (corner domain).
    pub uv_layers: LayerSet<UvLayer>,
    /// Color layers (point or corner domain).
    pub color_layers: LayerSet<ColorLayer>,
}

impl Mesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self {
            face_offsets: vec![0],
            ..Default::default()
        }
    }

    /// Creates a mesh from positions and per-face vertex lists.
    ///
    /// Indices are not validated; use the OBJ importer for untrusted input.
    pub fn from_faces<F: AsRef<[u32]>>(positions: Vec<Vec3>, faces: &[F]) -> Self {
        let mut mesh = Self::new();
        mesh.positions = positions;
        for face in faces {
            mesh.add_face(face.as_ref());
        }
        mesh
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Returns the number of faces.
    pub fn face_count(&self) -> usize {
        self.face_offsets.len().saturating_sub(1)
    }

    /// Returns the number of loops (face corners).
    pub fn loop_count(&self) -> usize {
        self.corner_verts.len()
    }

    /// Adds a vertex and returns its index.
    ///
    /// Point-domain color layers grow with the default color.
    pub fn add_vertex(&mut self, position: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        for layer in self.color_layers.iter_mut() {
            if layer.domain == rhizome_tilemesh_core::AttributeDomain::Point {
                layer.resize(self.positions.len());
            }
        }
        index
    }

    /// Adds a face and returns its index.
    ///
    /// Corner-domain layers grow to cover the new loops.
    pub fn add_face(&mut self, verts: &[u32]) -> u32 {
        if self.face_offsets.is_empty() {
            self.face_offsets.push(0);
        }
        let index = self.face_count() as u32;
        self.corner_verts.extend_from_slice(verts);
        self.face_offsets.push(self.corner_verts.len() as u32);

        let loops = self.corner_verts.len();
        for layer in self.uv_layers.iter_mut() {
            layer.uvs.resize(loops, glam::Vec2::ZERO);
        }
        for layer in self.color_layers.iter_mut() {
            if layer.domain == rhizome_tilemesh_core::AttributeDomain::Corner {
                layer.resize(loops);
            }
        }
        index
    }

    /// Returns the loop range of a face.
    pub fn face_loops(&self, face: usize) -> Range<usize> {
        self.face_offsets[face] as usize..self.face_offsets[face + 1] as usize
    }

    /// Returns the vertex indices of a face, in winding order.
    pub fn face_verts(&self, face: usize) -> &[u32] {
        &self.corner_verts[self.face_loops(face)]
    }

    /// Mean of the face's vertex positions.
    pub fn face_center(&self, face: usize) -> Vec3 {
        let verts = self.face_verts(face);
        if verts.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = verts.iter().map(|&v| self.positions[v as usize]).sum();
        sum / verts.len() as f32
    }

    /// Unit face normal by Newell's method, zero for degenerate faces.
    pub fn face_normal(&self, face: usize) -> Vec3 {
        let verts = self.face_verts(face);
        let mut normal = Vec3::ZERO;
        for (i, &v) in verts.iter().enumerate() {
            let current = self.positions[v as usize];
            let next = self.positions[verts[(i + 1) % verts.len()] as usize];
            normal.x += (current.y - next.y) * (current.z + next.z);
            normal.y += (current.z - next.z) * (current.x + next.x);
            normal.z += (current.x - next.x) * (current.y + next.y);
        }
        normal.normalize_or_zero()
    }

    /// Unit normals of every face.
    pub fn face_normals(&self) -> Vec<Vec3> {
        (0..self.face_count()).map(|f| self.face_normal(f)).collect()
    }

    /// Per-vertex normals: normalized mean of the face normals at each corner.
    ///
    /// Loose vertices get a zero normal.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut sums = vec![Vec3::ZERO; self.vertex_count()];
        for face in 0..self.face_count() {
            let normal = self.face_normal(face);
            for &v in self.face_verts(face) {
                sums[v as usize] += normal;
            }
        }
        sums.into_iter().map(Vec3::normalize_or_zero).collect()
    }

    /// All unique edges, sorted.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = BTreeSet::new();
        for face in 0..self.face_count() {
            let verts = self.face_verts(face);
            for (i, &a) in verts.iter().enumerate() {
                let b = verts[(i + 1) % verts.len()];
                if a != b {
                    edges.insert(Edge::new(a, b));
                }
            }
        }
        edges.into_iter().collect()
    }

    /// Edge-connected neighbours of every vertex, sorted.
    pub fn vertex_neighbors(&self) -> Vec<Vec<u32>> {
        let mut neighbors = vec![Vec::new(); self.vertex_count()];
        for edge in self.edges() {
            let (a, b) = edge.vertices();
            neighbors[a as usize].push(b);
            neighbors[b as usize].push(a);
        }
        for list in &mut neighbors {
            list.sort_unstable();
        }
        neighbors
    }

    /// Faces using each vertex, in face order.
    pub fn vertex_faces(&self) -> Vec<Vec<u32>> {
        let mut faces = vec![Vec::new(); self.vertex_count()];
        for face in 0..self.face_count() {
            for &v in self.face_verts(face) {
                let list: &mut Vec<u32> = &mut faces[v as usize];
                if list.last() != Some(&(face as u32)) {
                    list.push(face as u32);
                }
            }
        }
        faces
    }
}
