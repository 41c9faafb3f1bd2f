//! Polygon primitives for building test and starter meshes.
//!
//! Faces stay as quads; nothing is triangulated.

use glam::{Vec2, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Mesh, MeshObject};

/// A flat grid of quads on the XY plane, centered at the origin, facing +Z.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(feature = "dynop", op(input = (), output = MeshObject))]
pub struct Grid {
    /// Total size along X and Y.
    pub size: Vec2,
    /// Quads along X.
    pub columns: u32,
    /// Quads along Y.
    pub rows: u32,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            size: Vec2::splat(2.0),
            columns: 4,
            rows: 4,
        }
    }
}

impl Grid {
    /// Builds the grid mesh.
    pub fn build(&self) -> Mesh {
        let columns = self.columns.max(1);
        let rows = self.rows.max(1);
        let half = self.size * 0.5;

        let mut mesh = Mesh::new();
        for y in 0..=rows {
            for x in 0..=columns {
                let t = Vec2::new(x as f32 / columns as f32, y as f32 / rows as f32);
                let p = -half + t * self.size;
                mesh.add_vertex(Vec3::new(p.x, p.y, 0.0));
            }
        }

        let stride = columns + 1;
        for y in 0..rows {
            for x in 0..columns {
                let i = y * stride + x;
                mesh.add_face(&[i, i + 1, i + stride + 1, i + stride]);
            }
        }
        mesh
    }

    /// Wraps the grid in an object named "Grid".
    pub fn apply(&self) -> MeshObject {
        MeshObject::new("Grid", self.build())
    }
}

/// An axis-aligned box of six quads, centered at the origin, outward facing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(feature = "dynop", op(input = (), output = MeshObject))]
pub struct Cuboid {
    pub size: Vec3,
}

impl Default for Cuboid {
    fn default() -> Self {
        Self { size: Vec3::ONE }
    }
}

impl Cuboid {
    pub fn build(&self) -> Mesh {
        let h = self.size * 0.5;
        let positions = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        Mesh::from_faces(
            positions,
            &[
                [0u32, 3, 2, 1], // -Z
                [4, 5, 6, 7],    // +Z
                [0, 1, 5, 4],    // -Y
                [2, 3, 7, 6],    // +Y
                [0, 4, 7, 3],    // -X
                [1, 2, 6, 5],    // +X
            ],
        )
    }

    pub fn apply(&self) -> MeshObject {
        MeshObject::new("Cube", self.build())
    }
}
