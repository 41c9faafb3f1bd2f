//! Vertex color operators.

use glam::{Mat3, Vec3};
use rhizome_tilemesh_color::{LayerBlend, Rgba, adjust_intensity, blend};
use rhizome_tilemesh_core::{AttributeDomain, EditError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::layers::{ColorLayer, ColorType};
use crate::object::{MeshObject, Operator, Outcome};
use crate::vertex_color::{
    blur_colors, directional_shade, dot_shade, lerp_by_red, normalize_grayscale, weighted_density,
};
use crate::Mesh;

fn check_range<T: PartialOrd + std::fmt::Display>(
    name: &'static str,
    value: T,
    min: T,
    max: T,
) -> Result<(), EditError> {
    if value < min || value > max {
        return Err(EditError::invalid_parameter(
            name,
            format!("{value} is outside [{min}, {max}]"),
        ));
    }
    Ok(())
}

fn check_layer_name(name: &'static str, value: &str) -> Result<(), EditError> {
    if value.trim().is_empty() {
        return Err(EditError::invalid_parameter(name, "layer name cannot be empty"));
    }
    Ok(())
}

/// Fails unless a point-domain layer named `name` can be written.
fn check_point_layer(mesh: &Mesh, name: &str) -> Result<(), EditError> {
    match mesh.color_layers.get(name) {
        Some(layer) if layer.domain != AttributeDomain::Point => {
            Err(EditError::UnsupportedDomain {
                layer: name.to_string(),
                domain: layer.domain,
            })
        }
        _ => Ok(()),
    }
}

/// Fails unless `name` is absent or a float point-domain layer.
fn check_float_point_layer(mesh: &Mesh, name: &str) -> Result<(), EditError> {
    match mesh.color_layers.get(name) {
        Some(layer)
            if layer.domain != AttributeDomain::Point || layer.color_type != ColorType::Float =>
        {
            Err(EditError::LayerTypeMismatch {
                layer: name.to_string(),
                expected: format!("{} {}", ColorType::Float, AttributeDomain::Point),
            })
        }
        _ => Ok(()),
    }
}

fn ensure_point_layer(mesh: &mut Mesh, name: &str, color_type: ColorType) -> usize {
    let len = mesh.vertex_count();
    mesh.color_layers.ensure(name, || {
        ColorLayer::new(name, AttributeDomain::Point, color_type, len)
    })
}

/// Writes gray values into the point layer at `index`.
fn write_gray(mesh: &mut Mesh, index: usize, values: &[f32]) {
    if let Some(layer) = mesh.color_layers.by_index_mut(index) {
        layer.assign(values.iter().map(|&v| Rgba::gray(v)));
    }
}

/// Active color layer, which must exist.
fn active_layer(object: &MeshObject) -> Result<&ColorLayer, EditError> {
    let index = object.active_color_layer_index()?;
    object
        .mesh
        .color_layers
        .by_index(index)
        .ok_or(EditError::NoActiveColorLayer)
}

/// Rewrites the active layer element by element.
fn map_active_layer(object: &mut MeshObject, f: impl Fn(Rgba) -> Rgba) -> Result<String, EditError> {
    let layer = object
        .mesh
        .color_layers
        .active_mut()
        .ok_or(EditError::NoActiveColorLayer)?;
    let mapped: Vec<Rgba> = layer.colors().iter().map(|&c| f(c)).collect();
    layer.assign(mapped);
    Ok(layer.name.clone())
}

/// Smooths the active point-domain color layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct BlurVertexColors {
    /// Smoothing passes, 1 to 50.
    pub iterations: u32,
}

impl Default for BlurVertexColors {
    fn default() -> Self {
        Self { iterations: 1 }
    }
}

impl Operator for BlurVertexColors {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        check_range("iterations", self.iterations, 1, 50)?;
        let layer = active_layer(object)?;
        if layer.domain != AttributeDomain::Point {
            return Err(EditError::UnsupportedDomain {
                layer: layer.name.clone(),
                domain: layer.domain,
            });
        }

        let blurred = blur_colors(&object.mesh, layer.colors(), self.iterations);
        let name = map_assign(object, blurred)?;
        tracing::info!(layer = %name, iterations = self.iterations, "blurred vertex colors");
        object.info(format!(
            "Blur applied to '{name}' with {} iteration(s)",
            self.iterations
        ));
        Ok(Outcome::Finished)
    }
}

fn map_assign(object: &mut MeshObject, colors: Vec<Rgba>) -> Result<String, EditError> {
    let layer = object
        .mesh
        .color_layers
        .active_mut()
        .ok_or(EditError::NoActiveColorLayer)?;
    layer.assign(colors);
    Ok(layer.name.clone())
}

/// Paints Gaussian-weighted vertex density into a float point layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct PaintDensity {
    /// Neighbourhood radius, 0.001 to 10.
    pub radius: f32,
    /// Density mapped to white, 0.1 to 100.
    pub max_density: f32,
    pub layer: String,
}

impl Default for PaintDensity {
    fn default() -> Self {
        Self {
            radius: 0.1,
            max_density: 10.0,
            layer: "DensityColorWeighted".to_string(),
        }
    }
}

impl Operator for PaintDensity {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        check_range("radius", self.radius, 0.001, 10.0)?;
        check_range("max_density", self.max_density, 0.1, 100.0)?;
        check_layer_name("layer", &self.layer)?;
        check_point_layer(&object.mesh, &self.layer)?;

        let values = weighted_density(&object.mesh.positions, self.radius, self.max_density);
        let index = ensure_point_layer(&mut object.mesh, &self.layer, ColorType::Float);
        write_gray(&mut object.mesh, index, &values);
        object.mesh.color_layers.set_active(&self.layer);

        tracing::info!(layer = %self.layer, vertices = values.len(), "painted vertex density");
        object.info(format!("Weighted vertex density painted to '{}'", self.layer));
        Ok(Outcome::Finished)
    }
}

/// Shades vertices by how much their normal faces a direction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct DirectionalShade {
    pub direction: Vec3,
    /// Rotate `direction` by the object's world matrix.
    pub use_world_space: bool,
    pub layer: String,
}

impl Default for DirectionalShade {
    fn default() -> Self {
        Self {
            direction: Vec3::Z,
            use_world_space: true,
            layer: "Directional".to_string(),
        }
    }
}

impl Operator for DirectionalShade {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        check_layer_name("layer", &self.layer)?;
        if self.direction.length_squared() == 0.0 {
            return Err(EditError::invalid_parameter(
                "direction",
                "direction vector cannot be zero",
            ));
        }
        let direction = if self.use_world_space {
            Mat3::from_mat4(object.matrix_world) * self.direction
        } else {
            self.direction
        };
        let direction = direction.try_normalize().ok_or_else(|| {
            EditError::invalid_parameter("direction", "direction collapses under the world matrix")
        })?;
        check_point_layer(&object.mesh, &self.layer)?;

        let values = directional_shade(&object.mesh.vertex_normals(), direction);
        let index = ensure_point_layer(&mut object.mesh, &self.layer, ColorType::Byte);
        write_gray(&mut object.mesh, index, &values);
        object.mesh.color_layers.set_active(&self.layer);

        tracing::debug!(?direction, "directional shade direction");
        tracing::info!(layer = %self.layer, "directional shade written");
        object.info(format!(
            "Directional shade written to POINT attribute '{}'",
            self.layer
        ));
        Ok(Outcome::Finished)
    }
}

/// Shades vertices by the angle between their edges and their normal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct DotShade {
    pub layer: String,
}

impl Default for DotShade {
    fn default() -> Self {
        Self {
            layer: "Dot shade".to_string(),
        }
    }
}

impl Operator for DotShade {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        check_layer_name("layer", &self.layer)?;
        check_point_layer(&object.mesh, &self.layer)?;

        let values = dot_shade(&object.mesh);
        let index = ensure_point_layer(&mut object.mesh, &self.layer, ColorType::Float);
        write_gray(&mut object.mesh, index, &values);

        tracing::info!(layer = %self.layer, "dot shade written");
        object.info(format!("Dot shade written to POINT attribute '{}'", self.layer));
        Ok(Outcome::Finished)
    }
}

/// Scales the active layer's RGB away from (or toward) a center value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct AdjustIntensity {
    /// Contrast factor, -2 to 2.
    pub intensity: f32,
    /// Pivot value, 0 to 1.
    pub center: f32,
}

impl Default for AdjustIntensity {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            center: 0.5,
        }
    }
}

impl Operator for AdjustIntensity {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        check_range("intensity", self.intensity, -2.0, 2.0)?;
        check_range("center", self.center, 0.0, 1.0)?;
        let (intensity, center) = (self.intensity, self.center);
        let name = map_active_layer(object, |c| adjust_intensity(c, intensity, center))?;

        tracing::info!(layer = %name, intensity, center, "adjusted intensity");
        object.info(format!(
            "Adjusted intensity on '{name}' with center {center}"
        ));
        Ok(Outcome::Finished)
    }
}

/// Stretches the active layer's red channel to the full `[0, 1]` range as gray.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct NormalizeGrayscale {}

impl Operator for NormalizeGrayscale {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        let layer = active_layer(object)?;
        let Some(normalized) = normalize_grayscale(layer.colors()) else {
            return Ok(object.cancel("All values are the same. Normalization skipped."));
        };

        let name = map_assign(object, normalized)?;
        tracing::info!(layer = %name, "normalized grayscale");
        object.info(format!("Normalized vertex colors in '{name}'"));
        Ok(Outcome::Finished)
    }
}

/// Recolors the active layer by interpolating two colors with its red channel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct LerpColorsByRed {
    /// Color where red is 0.
    pub color_a: Vec3,
    /// Color where red is 1.
    pub color_b: Vec3,
}

impl Default for LerpColorsByRed {
    fn default() -> Self {
        Self {
            color_a: Vec3::ZERO,
            color_b: Vec3::ONE,
        }
    }
}

impl Operator for LerpColorsByRed {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        let (a, b) = (self.color_a, self.color_b);
        let name = map_active_layer(object, |c| lerp_by_red(c, a, b))?;

        tracing::info!(layer = %name, "lerped colors by red channel");
        object.info("Lerped vertex colors using red channel.");
        Ok(Outcome::Finished)
    }
}

/// Paints the selected vertices of a float point layer.
///
/// Requires edit mode. The layer is created if absent and made active.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct ApplyVertexColor {
    pub color: Vec3,
    pub layer: String,
}

impl Default for ApplyVertexColor {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            layer: "Color".to_string(),
        }
    }
}

impl Operator for ApplyVertexColor {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        check_layer_name("layer", &self.layer)?;
        object.require_edit_mode()?;

        let vertices = object.selected_vertices();
        if vertices.is_empty() {
            return Ok(object.cancel("No vertices selected."));
        }
        check_float_point_layer(&object.mesh, &self.layer)?;

        let index = ensure_point_layer(&mut object.mesh, &self.layer, ColorType::Float);
        if let Some(layer) = object.mesh.color_layers.by_index_mut(index) {
            let color = Rgba::from_rgb(self.color);
            for &v in &vertices {
                layer.set(v as usize, color);
            }
        }
        object.mesh.color_layers.set_active(&self.layer);

        tracing::info!(layer = %self.layer, vertices = vertices.len(), "applied vertex color");
        object.info(format!(
            "Applied color to {} vertices in layer '{}'",
            vertices.len(),
            self.layer
        ));
        Ok(Outcome::Finished)
    }
}

/// Fills every vertex of a float point layer with one color.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct FillVertexColor {
    pub color: Vec3,
    pub layer: String,
}

impl Default for FillVertexColor {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            layer: "Color".to_string(),
        }
    }
}

impl Operator for FillVertexColor {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        check_layer_name("layer", &self.layer)?;
        check_float_point_layer(&object.mesh, &self.layer)?;

        let index = ensure_point_layer(&mut object.mesh, &self.layer, ColorType::Float);
        if let Some(layer) = object.mesh.color_layers.by_index_mut(index) {
            layer.fill(Rgba::from_rgb(self.color));
        }
        object.mesh.color_layers.set_active(&self.layer);

        tracing::info!(layer = %self.layer, "filled vertex color");
        object.info(format!("Model filled with color in layer '{}'", self.layer));
        Ok(Outcome::Finished)
    }
}

/// Blends two color layers of the same domain into a result layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct CombineColorLayers {
    pub layer_a: String,
    pub layer_b: String,
    /// Created as a byte layer in `layer_a`'s domain if absent.
    pub result: String,
    pub mode: LayerBlend,
}

impl Default for CombineColorLayers {
    fn default() -> Self {
        Self {
            layer_a: String::new(),
            layer_b: String::new(),
            result: "ColorCombined".to_string(),
            mode: LayerBlend::Max,
        }
    }
}

impl Operator for CombineColorLayers {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        check_layer_name("result", &self.result)?;
        let layers = &object.mesh.color_layers;
        let a = layers
            .get(&self.layer_a)
            .ok_or_else(|| EditError::MissingColorLayer(self.layer_a.clone()))?;
        let b = layers
            .get(&self.layer_b)
            .ok_or_else(|| EditError::MissingColorLayer(self.layer_b.clone()))?;
        if a.domain != b.domain {
            return Err(EditError::DomainMismatch {
                a: a.domain,
                b: b.domain,
            });
        }
        match layers.get(&self.result) {
            Some(existing) if existing.domain != a.domain => {
                return Err(EditError::DomainMismatch {
                    a: a.domain,
                    b: existing.domain,
                });
            }
            _ => {}
        }

        let domain = a.domain;
        let combined: Vec<Rgba> = a
            .colors()
            .iter()
            .zip(b.colors())
            .map(|(&ca, &cb)| blend(ca, cb, self.mode))
            .collect();

        let mesh = &mut object.mesh;
        let layer = ColorLayer::for_mesh(&self.result, domain, ColorType::Byte, mesh);
        let index = mesh.color_layers.ensure(&self.result, || layer);
        if let Some(result) = mesh.color_layers.by_index_mut(index) {
            result.assign(combined);
        }

        tracing::info!(result = %self.result, mode = ?self.mode, "combined color layers");
        object.info(format!(
            "Combined using {:?} mode into '{}'",
            self.mode, self.result
        ));
        Ok(Outcome::Finished)
    }
}
