//! Per-face UV tiling.
//!
//! Every face gets its own planar parameterization, fitted into one cell of a
//! uniform `N x N` tile grid. The snap, rotate and flip passes then treat each
//! face's UV bounding box as the unit of transformation.
//!
//! The functions here work on plain slices and a [`Mesh`]; the operator
//! structs in [`crate::uv_ops`] add validation, selection and reporting.

use glam::{Vec2, Vec3};
use rhizome_tilemesh_core::EditError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Mesh;

/// Extents below this are treated as zero.
pub const DEGENERATE_EPSILON: f32 = 1e-9;

/// Faces whose normal is this close to the up axis use the global X/Y basis.
pub const HORIZONTAL_THRESHOLD: f32 = 0.999;

/// A validated `N x N` partition of UV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    tile_count: u32,
}

impl TileGrid {
    /// Creates a grid with `tile_count` tiles per UV unit.
    pub fn new(tile_count: u32) -> Result<Self, EditError> {
        if tile_count == 0 {
            return Err(EditError::invalid_parameter(
                "tile_count",
                "must be at least 1",
            ));
        }
        Ok(Self { tile_count })
    }

    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    /// Edge length of one cell, `1 / tile_count`.
    pub fn tile_size(&self) -> f32 {
        1.0 / self.tile_count as f32
    }

    /// Total number of cells, `tile_count²`.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.tile_count) * u64::from(self.tile_count)
    }

    /// Column and row of a row-major cell index.
    pub fn cell(&self, tile_index: u32) -> Result<(u32, u32), EditError> {
        if u64::from(tile_index) >= self.cell_count() {
            return Err(EditError::invalid_parameter(
                "tile_index",
                format!(
                    "{tile_index} is outside 0..{} for a {n}x{n} grid",
                    self.cell_count(),
                    n = self.tile_count
                ),
            ));
        }
        Ok((tile_index % self.tile_count, tile_index / self.tile_count))
    }

    /// Lower-left UV corner of a cell.
    pub fn tile_origin(&self, tile_index: u32) -> Result<Vec2, EditError> {
        let (column, row) = self.cell(tile_index)?;
        Ok(Vec2::new(column as f32, row as f32) * self.tile_size())
    }
}

/// How projected faces are scaled into UV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ScaleMode {
    /// Fit each face into exactly one tile.
    #[default]
    Tile,
    /// Keep world-space proportions, scaled by the tile size.
    World,
}

/// Mirror axis for [`flip_face`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FlipAxis {
    #[default]
    U,
    V,
}

/// A rotation by a whole number of 90° clockwise steps in `[-3, 3]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterTurns {
    steps: i32,
}

impl QuarterTurns {
    pub fn new(steps: i32) -> Result<Self, EditError> {
        if !(-3..=3).contains(&steps) {
            return Err(EditError::invalid_parameter(
                "steps",
                format!("{steps} is outside [-3, 3]"),
            ));
        }
        Ok(Self { steps })
    }

    /// Requested step count.
    pub fn steps(&self) -> i32 {
        self.steps
    }

    /// Clockwise steps after reduction modulo 4, in `0..4`.
    pub fn normalized(&self) -> u32 {
        self.steps.rem_euclid(4) as u32
    }

    pub fn is_identity(&self) -> bool {
        self.normalized() == 0
    }
}

/// Result of projecting one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceProjection {
    Projected,
    /// All corners collapsed to one point; every UV was set to (0, 0).
    Degenerate,
}

/// Per-face projection settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectSettings {
    pub grid: TileGrid,
    pub scale_mode: ScaleMode,
    pub preserve_aspect: bool,
}

/// Counters from [`project_per_face`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectStats {
    /// Faces given a regular projection.
    pub projected: usize,
    /// Faces mapped to the origin.
    pub degenerate: usize,
    /// Faces with fewer than three corners, left untouched.
    pub skipped: usize,
}

/// Axis-aligned bounds of a set of UVs, `(min, max)`.
///
/// Empty input yields inverted infinite bounds.
pub fn uv_bounds(uvs: &[Vec2]) -> (Vec2, Vec2) {
    let mut min = Vec2::splat(f32::MAX);
    let mut max = Vec2::splat(f32::MIN);

    for uv in uvs {
        min = min.min(*uv);
        max = max.max(*uv);
    }

    (min, max)
}

/// Tangent basis `(u_axis, v_axis)` for a face normal.
///
/// Near-horizontal faces use the global X and Y axes; others use
/// `up × normal` and `normal × u`. A zero normal yields a zero basis.
pub fn face_basis(normal: Vec3) -> (Vec3, Vec3) {
    if normal.dot(Vec3::Z).abs() > HORIZONTAL_THRESHOLD {
        return (Vec3::X, Vec3::Y);
    }
    let u_axis = Vec3::Z.cross(normal).normalize_or_zero();
    let v_axis = normal.cross(u_axis).normalize_or_zero();
    (u_axis, v_axis)
}

/// Projects one face's corner positions into `out` (same length).
pub fn project_face(
    points: &[Vec3],
    normal: Vec3,
    settings: &ProjectSettings,
    out: &mut [Vec2],
) -> FaceProjection {
    debug_assert_eq!(points.len(), out.len());
    if points.is_empty() {
        return FaceProjection::Degenerate;
    }

    let origin = points.iter().copied().sum::<Vec3>() / points.len() as f32;
    let (u_axis, v_axis) = face_basis(normal);

    for (uv, &p) in out.iter_mut().zip(points) {
        let rel = p - origin;
        *uv = Vec2::new(rel.dot(u_axis), rel.dot(v_axis));
    }

    let (min, max) = uv_bounds(out);
    let size = max - min;

    if size.x < DEGENERATE_EPSILON && size.y < DEGENERATE_EPSILON {
        out.fill(Vec2::ZERO);
        return FaceProjection::Degenerate;
    }

    let tile_size = settings.grid.tile_size();
    let scale = match settings.scale_mode {
        ScaleMode::Tile if settings.preserve_aspect => {
            Vec2::splat(tile_size / size.x.max(size.y).max(DEGENERATE_EPSILON))
        }
        ScaleMode::Tile => Vec2::new(
            axis_scale(tile_size, size.x),
            axis_scale(tile_size, size.y),
        ),
        ScaleMode::World => Vec2::splat(tile_size),
    };

    for uv in out.iter_mut() {
        *uv = (*uv - min) * scale;
    }

    FaceProjection::Projected
}

fn axis_scale(tile_size: f32, extent: f32) -> f32 {
    if extent > DEGENERATE_EPSILON {
        tile_size / extent
    } else {
        1.0
    }
}

/// Translates a face's UVs so their bounding-box minimum lands on `origin`.
pub fn snap_face(uvs: &mut [Vec2], origin: Vec2) {
    if uvs.is_empty() {
        return;
    }
    let (min, _) = uv_bounds(uvs);
    let delta = origin - min;
    for uv in uvs.iter_mut() {
        *uv += delta;
    }
}

/// Rotates a face's UVs clockwise about their bounding-box center,
/// keeping the bounding-box minimum in place.
pub fn rotate_face(uvs: &mut [Vec2], turns: QuarterTurns) {
    let steps = turns.normalized();
    transform_about_center(uvs, |rel| {
        let (mut x, mut y) = (rel.x, rel.y);
        for _ in 0..steps {
            (x, y) = (y, -x);
        }
        Vec2::new(x, y)
    });
}

/// Mirrors a face's UVs about their bounding-box center along `axis`,
/// keeping the bounding-box minimum in place.
pub fn flip_face(uvs: &mut [Vec2], axis: FlipAxis) {
    transform_about_center(uvs, |rel| match axis {
        FlipAxis::U => Vec2::new(-rel.x, rel.y),
        FlipAxis::V => Vec2::new(rel.x, -rel.y),
    });
}

// Applies `f` relative to the bbox center, then re-anchors the new bbox
// minimum to the old one.
fn transform_about_center(uvs: &mut [Vec2], f: impl Fn(Vec2) -> Vec2) {
    if uvs.is_empty() {
        return;
    }
    let (min, max) = uv_bounds(uvs);
    let center = (min + max) * 0.5;

    for uv in uvs.iter_mut() {
        *uv = f(*uv - center) + center;
    }

    let (new_min, _) = uv_bounds(uvs);
    let delta = min - new_min;
    for uv in uvs.iter_mut() {
        *uv += delta;
    }
}

/// Projects every face of `mesh` into the UV layer at `layer`.
///
/// Faces with fewer than three corners keep their UVs. An invalid `layer`
/// index projects nothing.
pub fn project_per_face(mesh: &mut Mesh, layer: usize, settings: &ProjectSettings) -> ProjectStats {
    let mut stats = ProjectStats::default();
    let mut points = Vec::new();

    for face in 0..mesh.face_count() {
        let loops = mesh.face_loops(face);
        if loops.len() < 3 {
            stats.skipped += 1;
            continue;
        }

        points.clear();
        points.extend(
            mesh.face_verts(face)
                .iter()
                .map(|&v| mesh.positions[v as usize]),
        );
        let normal = mesh.face_normal(face);

        let Some(uv_layer) = mesh.uv_layers.by_index_mut(layer) else {
            break;
        };
        match project_face(&points, normal, settings, &mut uv_layer.uvs[loops]) {
            FaceProjection::Projected => stats.projected += 1,
            FaceProjection::Degenerate => stats.degenerate += 1,
        }
    }

    stats
}

/// Applies `f` to the UV slice of each listed face with at least three
/// corners. Returns the number of faces visited.
pub fn for_each_face_uvs(
    mesh: &mut Mesh,
    layer: usize,
    faces: &[u32],
    mut f: impl FnMut(&mut [Vec2]),
) -> usize {
    let ranges: Vec<_> = faces
        .iter()
        .map(|&face| mesh.face_loops(face as usize))
        .filter(|loops| loops.len() >= 3)
        .collect();

    let Some(uv_layer) = mesh.uv_layers.by_index_mut(layer) else {
        return 0;
    };
    for loops in &ranges {
        f(&mut uv_layer.uvs[loops.clone()]);
    }
    ranges.len()
}

/// Faces among `faces` that have at least three corners.
pub fn tileable_faces(mesh: &Mesh, faces: &[u32]) -> Vec<u32> {
    faces
        .iter()
        .copied()
        .filter(|&f| mesh.face_loops(f as usize).len() >= 3)
        .collect()
}
