//! Vertex color computations.
//!
//! Pure functions producing per-vertex values; the operators in
//! [`crate::color_ops`] decide which layer they land in.

use glam::Vec3;
use rhizome_tilemesh_color::Rgba;
use rhizome_tilemesh_spatial::Octree;

use crate::Mesh;

/// Edge and normal averages shorter than this are treated as undefined.
pub const DOT_SHADE_EPSILON: f32 = 1e-6;

/// Value used by [`dot_shade`] where the average edge direction or normal is undefined.
pub const DOT_SHADE_FALLBACK: f32 = 0.5;

/// One smoothing pass over per-vertex colors.
///
/// Each vertex becomes the weighted mean of itself (weight 1) and its edge
/// neighbours (weight `1 / distance`, or 1 for coincident vertices). Alpha
/// is set to 1.
pub fn blur_step(mesh: &Mesh, neighbors: &[Vec<u32>], colors: &[Rgba]) -> Vec<Rgba> {
    colors
        .iter()
        .enumerate()
        .map(|(i, color)| {
            let position = mesh.positions[i];
            let mut total = color.rgb();
            let mut total_weight = 1.0;

            for &n in &neighbors[i] {
                let dist = position.distance(mesh.positions[n as usize]);
                let weight = if dist > 0.0 { 1.0 / dist } else { 1.0 };
                total += colors[n as usize].rgb() * weight;
                total_weight += weight;
            }

            Rgba::from_rgb(total / total_weight)
        })
        .collect()
}

/// Runs [`blur_step`] `iterations` times, each pass reading the previous result.
pub fn blur_colors(mesh: &Mesh, colors: &[Rgba], iterations: u32) -> Vec<Rgba> {
    let neighbors = mesh.vertex_neighbors();
    let mut current = colors.to_vec();
    for _ in 0..iterations {
        current = blur_step(mesh, &neighbors, &current);
    }
    current
}

/// Gaussian-weighted neighbour density of every point, mapped to `[0, 1]`.
///
/// For each point the weights `exp(-(d / radius)²)` of all points within
/// `radius` (inclusive, the point itself included) are summed, the self
/// contribution of 1 is removed, and the result is divided by
/// `max_density` and capped at 1.
pub fn weighted_density(positions: &[Vec3], radius: f32, max_density: f32) -> Vec<f32> {
    let octree = Octree::from_points(positions);
    positions
        .iter()
        .map(|&p| {
            let sum: f32 = octree
                .query_radius(p, radius)
                .iter()
                .map(|&(_, _, dist)| (-(dist / radius).powi(2)).exp())
                .sum();
            ((sum - 1.0) / max_density).min(1.0)
        })
        .collect()
}

/// Maps `n · direction` from `[-1, 1]` to `[0, 1]` for each normal.
///
/// `direction` must be normalized.
pub fn directional_shade(normals: &[Vec3], direction: Vec3) -> Vec<f32> {
    normals
        .iter()
        .map(|n| ((n.dot(direction) + 1.0) * 0.5).clamp(0.0, 1.0))
        .collect()
}

/// Concavity-style shade from the angle between edge directions and normals.
///
/// Per vertex, the mean of its normalized edge directions is compared with
/// the mean of its adjacent face normals; the value is `1 - (a·n + 1) / 2`.
/// Vertices without a defined mean get [`DOT_SHADE_FALLBACK`].
pub fn dot_shade(mesh: &Mesh) -> Vec<f32> {
    let neighbors = mesh.vertex_neighbors();
    let vertex_faces = mesh.vertex_faces();
    let face_normals = mesh.face_normals();

    (0..mesh.vertex_count())
        .map(|v| {
            let value = edge_normal_dot(
                mesh.positions[v],
                neighbors[v].iter().map(|&n| mesh.positions[n as usize]),
                vertex_faces[v].iter().map(|&f| face_normals[f as usize]),
            )
            .unwrap_or(DOT_SHADE_FALLBACK);
            1.0 - value
        })
        .collect()
}

fn edge_normal_dot(
    position: Vec3,
    neighbors: impl Iterator<Item = Vec3>,
    normals: impl Iterator<Item = Vec3>,
) -> Option<f32> {
    let direction = normalized_mean(
        neighbors
            .map(|n| n - position)
            .filter(|edge| edge.length() > DOT_SHADE_EPSILON)
            .map(Vec3::normalize),
    )?;
    let normal = normalized_mean(normals)?;
    Some((direction.dot(normal) + 1.0) * 0.5)
}

fn normalized_mean(vectors: impl Iterator<Item = Vec3>) -> Option<Vec3> {
    let (sum, count) = vectors.fold((Vec3::ZERO, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return None;
    }
    let mean = sum / count as f32;
    if mean.length() < DOT_SHADE_EPSILON {
        return None;
    }
    Some(mean.normalize())
}

/// Remaps the red channel's range to `[0, 1]` grayscale with alpha 1.
///
/// Returns `None` when every red value is equal (including empty input).
pub fn normalize_grayscale(colors: &[Rgba]) -> Option<Vec<Rgba>> {
    let min = colors.iter().map(|c| c.r).fold(f32::INFINITY, f32::min);
    let max = colors.iter().map(|c| c.r).fold(f32::NEG_INFINITY, f32::max);
    if colors.is_empty() || min == max {
        return None;
    }
    let range = max - min;
    Some(
        colors
            .iter()
            .map(|c| Rgba::gray((c.r - min) / range))
            .collect(),
    )
}

/// Interpolates between two colors using the red channel as the factor.
pub fn lerp_by_red(color: Rgba, a: Vec3, b: Vec3) -> Rgba {
    Rgba::from_rgb(a).lerp(Rgba::from_rgb(b), color.r)
}
