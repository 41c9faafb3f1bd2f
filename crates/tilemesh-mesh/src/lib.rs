//! Polygon meshes with per-face UV tiling and vertex color tools.
//!
//! Meshes keep n-gon faces with per-corner UV layers and per-point or
//! per-corner color layers. Editing operators are plain parameter structs
//! implementing [`Operator`]; with the `dynop` feature they also implement
//! `DynOp` so they can be saved and replayed as pipelines.
//!
//! # Example
//!
//! ```ignore
//! use rhizome_tilemesh_mesh::{Grid, MeshSelection, Operator, UvProjectPerFace, UvSnapToTile};
//!
//! let mut object = Grid::default().apply();
//! UvProjectPerFace::default().execute(&mut object)?;
//!
//! let selection = MeshSelection::all(&object.mesh);
//! let mut object = object.with_edit_mode().with_selection(selection);
//! UvSnapToTile { tile_index: 3, ..Default::default() }.execute(&mut object)?;
//! ```

mod color_ops;
mod layers;
mod mesh;
mod obj;
mod object;
mod primitives;
mod selection;
mod tiles;
mod uv_ops;
mod vertex_color;

pub use color_ops::{
    AdjustIntensity, ApplyVertexColor, BlurVertexColors, CombineColorLayers, DirectionalShade,
    DotShade, FillVertexColor, LerpColorsByRed, NormalizeGrayscale, PaintDensity,
};
pub use layers::{ColorLayer, ColorType, Layer, LayerSet, UvLayer};
pub use mesh::Mesh;
pub use obj::{
    IMPORTED_COLOR_LAYER, IMPORTED_UV_LAYER, ObjError, ObjExportOptions, export_obj,
    export_obj_with, export_obj_with_name, import_obj, import_obj_from_reader, write_obj,
};
pub use object::{EditMode, MeshObject, Operator, Outcome, Report, ReportLevel};
pub use primitives::{Cuboid, Grid};
pub use selection::{Edge, MeshSelection};
pub use tiles::{
    DEGENERATE_EPSILON, FaceProjection, FlipAxis, HORIZONTAL_THRESHOLD, ProjectSettings,
    ProjectStats, QuarterTurns, ScaleMode, TileGrid, face_basis, flip_face, for_each_face_uvs,
    project_face, project_per_face, rotate_face, snap_face, tileable_faces, uv_bounds,
};
pub use uv_ops::{SPRITE_UV_LAYER, UvFlipTiles, UvProjectPerFace, UvRotateTiles, UvSnapToTile};
pub use vertex_color::{
    DOT_SHADE_EPSILON, DOT_SHADE_FALLBACK, blur_colors, blur_step, directional_shade, dot_shade,
    lerp_by_red, normalize_grayscale, weighted_density,
};

pub use rhizome_tilemesh_core::{AttributeDomain, EditError};

/// Pipeline type name of [`MeshObject`] values.
#[cfg(feature = "dynop")]
pub const MESH_OBJECT_TYPE: &str = "MeshObject";

/// Wraps an object for use as pipeline input.
#[cfg(feature = "dynop")]
pub fn object_value(object: MeshObject) -> rhizome_tilemesh_op::OpValue {
    rhizome_tilemesh_op::OpValue::from(MESH_OBJECT_TYPE, object)
}

/// Registers all mesh operations with an [`OpRegistry`](rhizome_tilemesh_op::OpRegistry).
///
/// Call this to enable deserialization of mesh ops from saved pipelines.
#[cfg(feature = "dynop")]
pub fn register_ops(registry: &mut rhizome_tilemesh_op::OpRegistry) {
    // Primitives
    registry.register_type::<Grid>("tilemesh::Grid");
    registry.register_type::<Cuboid>("tilemesh::Cuboid");

    // UV tiling
    registry.register_type::<UvProjectPerFace>("tilemesh::UvProjectPerFace");
    registry.register_type::<UvSnapToTile>("tilemesh::UvSnapToTile");
    registry.register_type::<UvRotateTiles>("tilemesh::UvRotateTiles");
    registry.register_type::<UvFlipTiles>("tilemesh::UvFlipTiles");

    // Vertex colors
    registry.register_type::<BlurVertexColors>("tilemesh::BlurVertexColors");
    registry.register_type::<PaintDensity>("tilemesh::PaintDensity");
    registry.register_type::<DirectionalShade>("tilemesh::DirectionalShade");
    registry.register_type::<DotShade>("tilemesh::DotShade");
    registry.register_type::<AdjustIntensity>("tilemesh::AdjustIntensity");
    registry.register_type::<NormalizeGrayscale>("tilemesh::NormalizeGrayscale");
    registry.register_type::<LerpColorsByRed>("tilemesh::LerpColorsByRed");
    registry.register_type::<ApplyVertexColor>("tilemesh::ApplyVertexColor");
    registry.register_type::<FillVertexColor>("tilemesh::FillVertexColor");
    registry.register_type::<CombineColorLayers>("tilemesh::CombineColorLayers");
}
