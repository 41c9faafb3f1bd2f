//! Vertex color values and per-channel blending.
//!
//! Colors are stored on meshes as `Vec4` (RGBA, 0-1 range). [`Rgba`] wraps
//! that representation with the channel math used by the vertex color tools.

use glam::{Vec3, Vec4};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RGBA color with alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgba {
    /// Red channel (0-1).
    pub r: f32,
    /// Green channel (0-1).
    pub g: f32,
    /// Blue channel (0-1).
    pub b: f32,
    /// Alpha channel (0-1).
    pub a: f32,
}

impl Rgba {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Creates a new RGBA color.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque gray color.
    pub const fn gray(value: f32) -> Self {
        Self::new(value, value, value, 1.0)
    }

    /// Creates an opaque color from RGB.
    pub fn from_rgb(rgb: Vec3) -> Self {
        Self::new(rgb.x, rgb.y, rgb.z, 1.0)
    }

    /// Returns the RGB channels.
    pub fn rgb(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    /// Replaces the RGB channels, keeping alpha.
    pub fn with_rgb(self, rgb: Vec3) -> Self {
        Self::new(rgb.x, rgb.y, rgb.z, self.a)
    }

    /// Creates from a Vec4.
    pub fn from_vec4(v: Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }

    /// Converts to Vec4.
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r, self.g, self.b, self.a)
    }

    /// Linear interpolation with alpha.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::from_vec4(self.to_vec4().lerp(other.to_vec4(), t))
    }

    /// Clamps all components to [0, 1].
    pub fn clamp(self) -> Self {
        Self::from_vec4(self.to_vec4().clamp(Vec4::ZERO, Vec4::ONE))
    }

    /// Rounds every channel to the nearest 8-bit step.
    pub fn quantize_u8(self) -> Self {
        let v = (self.clamp().to_vec4() * 255.0).round() / 255.0;
        Self::from_vec4(v)
    }
}

impl From<Vec4> for Rgba {
    fn from(v: Vec4) -> Self {
        Self::from_vec4(v)
    }
}

impl From<Rgba> for Vec4 {
    fn from(c: Rgba) -> Self {
        c.to_vec4()
    }
}

// ============================================================================
// Layer blending
// ============================================================================

/// How two color layers are combined, channel by channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum LayerBlend {
    /// Maximum value per channel.
    #[default]
    Max,
    /// Minimum value per channel.
    Min,
    /// Sum, clamped to 1.
    Add,
    /// Product.
    Multiply,
    /// Mean of the two values.
    Average,
    /// Multiply or screen depending on the base value.
    Overlay,
}

/// Blends two colors using the specified mode.
///
/// All four channels (including alpha) go through the same formula.
pub fn blend(a: Rgba, b: Rgba, mode: LayerBlend) -> Rgba {
    let (a, b) = (a.to_vec4(), b.to_vec4());
    let v = match mode {
        LayerBlend::Max => a.max(b),
        LayerBlend::Min => a.min(b),
        LayerBlend::Add => (a + b).clamp(Vec4::ZERO, Vec4::ONE),
        LayerBlend::Multiply => a * b,
        LayerBlend::Average => (a + b) * 0.5,
        LayerBlend::Overlay => Vec4::new(
            overlay_channel(a.x, b.x),
            overlay_channel(a.y, b.y),
            overlay_channel(a.z, b.z),
            overlay_channel(a.w, b.w),
        )
        .clamp(Vec4::ZERO, Vec4::ONE),
    };
    Rgba::from_vec4(v)
}

/// Scales the RGB distance from a gray midpoint, clamping to [0, 1].
///
/// An intensity of 0 flattens every channel to `center`, 1 leaves the color
/// unchanged and values above 1 increase contrast. Alpha is preserved.
pub fn adjust_intensity(color: Rgba, intensity: f32, center: f32) -> Rgba {
    let rgb = (color.rgb() - Vec3::splat(center)) * intensity + Vec3::splat(center);
    color.with_rgb(rgb.clamp(Vec3::ZERO, Vec3::ONE))
}

/// Helper for overlay blend mode.
fn overlay_channel(base: f32, blend: f32) -> f32 {
    if base <= 0.5 {
        2.0 * base * blend
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - blend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_modes() {
        let base = Rgba::new(0.5, 0.5, 0.5, 1.0);
        let other = Rgba::new(0.8, 0.2, 0.4, 0.5);

        let max = blend(base, other, LayerBlend::Max);
        assert_eq!(max, Rgba::new(0.8, 0.5, 0.5, 1.0));

        let min = blend(base, other, LayerBlend::Min);
        assert_eq!(min, Rgba::new(0.5, 0.2, 0.4, 0.5));

        let add = blend(base, other, LayerBlend::Add);
        assert!((add.r - 1.0).abs() < 0.001); // clamped
        assert!((add.g - 0.7).abs() < 0.001);

        let mult = blend(base, other, LayerBlend::Multiply);
        assert!((mult.r - 0.4).abs() < 0.001);
        assert!((mult.a - 0.5).abs() < 0.001);

        let avg = blend(base, other, LayerBlend::Average);
        assert!((avg.r - 0.65).abs() < 0.001);
        assert!((avg.a - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_overlay_switches_at_half() {
        let dark = blend(Rgba::gray(0.25), Rgba::gray(0.5), LayerBlend::Overlay);
        assert!((dark.r - 0.25).abs() < 0.001);

        let mid = blend(Rgba::gray(0.5), Rgba::gray(0.5), LayerBlend::Overlay);
        assert!((mid.r - 0.5).abs() < 0.001);

        let light = blend(Rgba::gray(0.75), Rgba::gray(0.5), LayerBlend::Overlay);
        assert!((light.r - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_adjust_intensity() {
        let color = Rgba::new(0.75, 0.25, 0.5, 0.3);

        let flat = adjust_intensity(color, 0.0, 0.5);
        assert_eq!(flat, Rgba::new(0.5, 0.5, 0.5, 0.3));

        let same = adjust_intensity(color, 1.0, 0.5);
        assert_eq!(same, color);

        let contrast = adjust_intensity(color, 2.0, 0.5);
        assert_eq!(contrast, Rgba::new(1.0, 0.0, 0.5, 0.3));

        let inverted = adjust_intensity(color, -1.0, 0.5);
        assert_eq!(inverted, Rgba::new(0.25, 0.75, 0.5, 0.3));
    }

    #[test]
    fn test_quantize_u8() {
        let q = Rgba::new(0.5, 1.2, -0.1, 1.0).quantize_u8();
        assert!((q.r - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(q.g, 1.0);
        assert_eq!(q.b, 0.0);
    }

    #[test]
    fn test_lerp() {
        let mid = Rgba::BLACK.lerp(Rgba::WHITE, 0.5);
        assert!((mid.r - 0.5).abs() < 0.001);
        assert_eq!(mid.a, 1.0);
    }
}
