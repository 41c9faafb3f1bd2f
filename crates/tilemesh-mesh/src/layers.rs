//! Named attribute layers: UV maps and color layers.

use glam::Vec2;
use rhizome_tilemesh_color::Rgba;
use rhizome_tilemesh_core::AttributeDomain;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named layer stored in a [`LayerSet`].
pub trait Layer {
    /// Layer name, unique within its set.
    fn name(&self) -> &str;
}

/// Ordered named layers with an optional active layer.
#[derive(Debug, Clone)]
pub struct LayerSet<L> {
    layers: Vec<L>,
    active: Option<usize>,
}

impl<L> Default for LayerSet<L> {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            active: None,
        }
    }
}

impl<L: Layer> LayerSet<L> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if there are no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut L> {
        self.layers.iter_mut()
    }

    /// Index of the layer called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&L> {
        self.index_of(name).map(|i| &self.layers[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut L> {
        self.index_of(name).map(|i| &mut self.layers[i])
    }

    pub fn by_index(&self, index: usize) -> Option<&L> {
        self.layers.get(index)
    }

    pub fn by_index_mut(&mut self, index: usize) -> Option<&mut L> {
        self.layers.get_mut(index)
    }

    /// Index of the active layer.
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// The active layer, if any.
    pub fn active(&self) -> Option<&L> {
        self.active.and_then(|i| self.layers.get(i))
    }

    pub fn active_mut(&mut self) -> Option<&mut L> {
        self.active.and_then(|i| self.layers.get_mut(i))
    }

    /// Makes the named layer active. Returns false if it does not exist.
    pub fn set_active(&mut self, name: &str) -> bool {
        match self.index_of(name) {
            Some(index) => {
                self.active = Some(index);
                true
            }
            None => false,
        }
    }

    /// Resolves a layer by name, or the active layer when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Option<usize> {
        match name {
            Some(name) => self.index_of(name),
            None => self.active,
        }
    }

    /// Appends a layer and returns its index.
    ///
    /// The first layer added to a set without an active layer becomes active.
    pub fn add(&mut self, layer: L) -> usize {
        let index = self.layers.len();
        self.layers.push(layer);
        if self.active.is_none() {
            self.active = Some(index);
        }
        index
    }

    /// Returns the index of the layer called `name`, adding `make()` if absent.
    pub fn ensure(&mut self, name: &str, make: impl FnOnce() -> L) -> usize {
        match self.index_of(name) {
            Some(index) => index,
            None => self.add(make()),
        }
    }
}

/// A UV map: one coordinate per loop.
#[derive(Debug, Clone, PartialEq)]
pub struct UvLayer {
    pub name: String,
    pub uvs: Vec<Vec2>,
}

impl UvLayer {
    /// Creates a layer with `loops` zeroed coordinates.
    pub fn new(name: impl Into<String>, loops: usize) -> Self {
        Self {
            name: name.into(),
            uvs: vec![Vec2::ZERO; loops],
        }
    }
}

impl Layer for UvLayer {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Storage precision of a color layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColorType {
    /// 32-bit float per channel.
    #[default]
    Float,
    /// 8-bit per channel; written values are quantized to 1/255 steps.
    Byte,
}

impl fmt::Display for ColorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorType::Float => write!(f, "FLOAT_COLOR"),
            ColorType::Byte => write!(f, "BYTE_COLOR"),
        }
    }
}

/// A color attribute on either points or corners.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorLayer {
    pub name: String,
    pub domain: AttributeDomain,
    pub color_type: ColorType,
    data: Vec<Rgba>,
}

impl ColorLayer {
    /// Default value of newly created elements.
    pub const DEFAULT_COLOR: Rgba = Rgba::BLACK;

    /// Creates a layer of `len` elements set to [`Self::DEFAULT_COLOR`].
    pub fn new(
        name: impl Into<String>,
        domain: AttributeDomain,
        color_type: ColorType,
        len: usize,
    ) -> Self {
        Self {
            name: name.into(),
            domain,
            color_type,
            data: vec![Self::DEFAULT_COLOR; len],
        }
    }

    /// Creates a layer sized for `mesh` in the given domain.
    pub fn for_mesh(
        name: impl Into<String>,
        domain: AttributeDomain,
        color_type: ColorType,
        mesh: &crate::Mesh,
    ) -> Self {
        let len = match domain {
            AttributeDomain::Point => mesh.vertex_count(),
            AttributeDomain::Corner => mesh.loop_count(),
        };
        Self::new(name, domain, color_type, len)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.data
    }

    pub fn get(&self, index: usize) -> Option<Rgba> {
        self.data.get(index).copied()
    }

    /// Writes one element, quantizing for byte layers.
    pub fn set(&mut self, index: usize, color: Rgba) {
        let stored = self.store(color);
        self.data[index] = stored;
    }

    /// Writes every element.
    pub fn fill(&mut self, color: Rgba) {
        let stored = self.store(color);
        self.data.fill(stored);
    }

    /// Replaces all elements from an iterator of the same length.
    pub fn assign(&mut self, colors: impl IntoIterator<Item = Rgba>) {
        for (slot, color) in self.data.iter_mut().zip(colors) {
            *slot = match self.color_type {
                ColorType::Float => color,
                ColorType::Byte => color.quantize_u8(),
            };
        }
    }

    pub(crate) fn resize(&mut self, len: usize) {
        self.data.resize(len, Self::DEFAULT_COLOR);
    }

    fn store(&self, color: Rgba) -> Rgba {
        match self.color_type {
            ColorType::Float => color,
            ColorType::Byte => color.quantize_u8(),
        }
    }
}

impl Layer for ColorLayer {
    fn name(&self) -> &str {
        &self.name
    }
}
