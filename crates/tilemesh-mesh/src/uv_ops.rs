//! UV tiling operators.
//!
//! Serializable parameter structs that run the [`crate::tiles`] passes on a
//! [`MeshObject`], honoring its mode and selection.

use rhizome_tilemesh_core::EditError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::layers::UvLayer;
use crate::object::{MeshObject, Operator, Outcome};
use crate::tiles::{
    FlipAxis, ProjectSettings, QuarterTurns, ScaleMode, TileGrid, flip_face, for_each_face_uvs,
    project_per_face, rotate_face, snap_face, tileable_faces,
};

/// Name of the UV layer written by [`UvProjectPerFace`] by default.
pub const SPRITE_UV_LAYER: &str = "UVSprite";

/// Planar-projects every face into one tile of the UV grid.
///
/// Works in object or edit mode and ignores the selection. The target layer
/// is created if absent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct UvProjectPerFace {
    /// Tiles per UV unit.
    pub tile_count: u32,
    pub scale_mode: ScaleMode,
    /// Uniform scale in tile mode.
    pub preserve_aspect: bool,
    /// Target UV layer.
    pub layer: String,
}

impl Default for UvProjectPerFace {
    fn default() -> Self {
        Self {
            tile_count: 8,
            scale_mode: ScaleMode::Tile,
            preserve_aspect: true,
            layer: SPRITE_UV_LAYER.to_string(),
        }
    }
}

impl Operator for UvProjectPerFace {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        let settings = ProjectSettings {
            grid: TileGrid::new(self.tile_count)?,
            scale_mode: self.scale_mode,
            preserve_aspect: self.preserve_aspect,
        };

        let mesh = &mut object.mesh;
        let loops = mesh.loop_count();
        let layer = mesh
            .uv_layers
            .ensure(&self.layer, || UvLayer::new(self.layer.clone(), loops));

        let stats = project_per_face(mesh, layer, &settings);
        tracing::debug!(
            object = %object.name,
            layer = %self.layer,
            ?stats,
            "projected faces"
        );
        tracing::info!(faces = stats.projected + stats.degenerate, "UV project per face finished");

        object.info(format!(
            "Projected {} faces into '{}' ({} degenerate)",
            stats.projected + stats.degenerate,
            self.layer,
            stats.degenerate
        ));
        Ok(Outcome::Finished)
    }
}

/// Moves each selected face's UVs into the given tile.
///
/// Requires edit mode and an existing UV layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct UvSnapToTile {
    pub tile_count: u32,
    /// Row-major cell index in `0..tile_count²`.
    pub tile_index: u32,
    /// UV layer; the active layer when unset.
    pub layer: Option<String>,
}

impl Default for UvSnapToTile {
    fn default() -> Self {
        Self {
            tile_count: 8,
            tile_index: 0,
            layer: None,
        }
    }
}

impl Operator for UvSnapToTile {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        let grid = TileGrid::new(self.tile_count)?;
        let origin = grid.tile_origin(self.tile_index)?;
        object.require_edit_mode()?;
        let layer = object.uv_layer_index(self.layer.as_deref())?;

        let faces = tileable_faces(&object.mesh, &object.selected_faces());
        if faces.is_empty() {
            return Ok(object.cancel("No faces selected to snap."));
        }

        let count = for_each_face_uvs(&mut object.mesh, layer, &faces, |uvs| {
            snap_face(uvs, origin)
        });
        tracing::info!(faces = count, tile = self.tile_index, "snapped faces to tile");
        object.info(format!("Snapped {count} faces to tile {}", self.tile_index));
        Ok(Outcome::Finished)
    }
}

/// Rotates each selected face's UVs by quarter turns about its own bounds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct UvRotateTiles {
    /// Clockwise 90° steps in `[-3, 3]`.
    pub steps: i32,
    pub layer: Option<String>,
}

impl Default for UvRotateTiles {
    fn default() -> Self {
        Self {
            steps: 1,
            layer: None,
        }
    }
}

impl Operator for UvRotateTiles {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        let turns = QuarterTurns::new(self.steps)?;
        object.require_edit_mode()?;
        if turns.is_identity() {
            object.info(format!("Rotation by {} steps is a no-op", self.steps));
            tracing::debug!(steps = self.steps, "rotation is identity");
            return Ok(Outcome::Cancelled);
        }
        let layer = object.uv_layer_index(self.layer.as_deref())?;

        let faces = tileable_faces(&object.mesh, &object.selected_faces());
        if faces.is_empty() {
            return Ok(object.cancel("No faces selected to rotate."));
        }

        let count = for_each_face_uvs(&mut object.mesh, layer, &faces, |uvs| {
            rotate_face(uvs, turns)
        });
        tracing::info!(faces = count, steps = turns.normalized(), "rotated tiles");
        object.info(format!(
            "Rotated {count} faces by {} quarter turns",
            turns.normalized()
        ));
        Ok(Outcome::Finished)
    }
}

/// Mirrors each selected face's UVs about its own bounds.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "dynop", derive(rhizome_tilemesh_op::Op))]
#[cfg_attr(
    feature = "dynop",
    op(input = MeshObject, output = MeshObject, fallible)
)]
pub struct UvFlipTiles {
    pub axis: FlipAxis,
    pub layer: Option<String>,
}

impl Operator for UvFlipTiles {
    fn execute(&self, object: &mut MeshObject) -> Result<Outcome, EditError> {
        object.require_edit_mode()?;
        let layer = object.uv_layer_index(self.layer.as_deref())?;

        let faces = tileable_faces(&object.mesh, &object.selected_faces());
        if faces.is_empty() {
            return Ok(object.cancel("No faces selected to flip."));
        }

        let axis = self.axis;
        let count = for_each_face_uvs(&mut object.mesh, layer, &faces, |uvs| flip_face(uvs, axis));
        tracing::info!(faces = count, ?axis, "flipped tiles");
        object.info(format!("Flipped {count} faces along {axis:?}"));
        Ok(Outcome::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ReportLevel;
    use crate::tiles::uv_bounds;
    use crate::{Mesh, MeshSelection};
    use glam::{Vec2, Vec3};

    /// Two unit quads side by side on the ground plane.
    fn strip() -> Mesh {
        Mesh::from_faces(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(2.0, 1.0, 0.0),
            ],
            &[[0u32, 1, 4, 3], [1, 2, 5, 4]],
        )
    }

    fn projected_edit_object() -> MeshObject {
        let mut object = MeshObject::new("Strip", strip());
        UvProjectPerFace::default().execute(&mut object).unwrap();
        let selection = MeshSelection::all(&object.mesh);
        object.with_edit_mode().with_selection(selection)
    }

    fn face_uvs(object: &MeshObject, face: usize) -> Vec<Vec2> {
        let loops = object.mesh.face_loops(face);
        object.mesh.uv_layers.active().unwrap().uvs[loops].to_vec()
    }

    #[test]
    fn test_project_creates_layer_in_object_mode() {
        let mut object = MeshObject::new("Strip", strip());
        let outcome = UvProjectPerFace::default().execute(&mut object).unwrap();
        assert_eq!(outcome, Outcome::Finished);

        let layer = object.mesh.uv_layers.get(SPRITE_UV_LAYER).unwrap();
        assert_eq!(layer.uvs.len(), 8);
        for face in 0..2 {
            let (min, max) = uv_bounds(&face_uvs(&object, face));
            assert!(min.length() < 1e-6);
            assert!((max - Vec2::splat(0.125)).length() < 1e-6);
        }
        assert_eq!(object.last_report().unwrap().level, ReportLevel::Info);
    }

    #[test]
    fn test_project_reuses_existing_layer() {
        let mut object = MeshObject::new("Strip", strip());
        UvProjectPerFace::default().execute(&mut object).unwrap();
        UvProjectPerFace {
            tile_count: 4,
            ..Default::default()
        }
        .execute(&mut object)
        .unwrap();
        assert_eq!(object.mesh.uv_layers.len(), 1);
        let (_, max) = uv_bounds(&face_uvs(&object, 0));
        assert!((max - Vec2::splat(0.25)).length() < 1e-6);
    }

    #[test]
    fn test_project_rejects_zero_tiles() {
        let mut object = MeshObject::new("Strip", strip());
        let err = UvProjectPerFace {
            tile_count: 0,
            ..Default::default()
        }
        .execute(&mut object)
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidParameter { name: "tile_count", .. }));
        assert!(object.mesh.uv_layers.is_empty());
    }

    #[test]
    fn test_snap_selected_faces() {
        let mut object = projected_edit_object();
        object.selection = MeshSelection::from_faces(&object.mesh, [1]);

        UvSnapToTile {
            tile_count: 8,
            tile_index: 9,
            layer: None,
        }
        .execute(&mut object)
        .unwrap();

        let (min, _) = uv_bounds(&face_uvs(&object, 1));
        assert!((min - Vec2::new(0.125, 0.125)).length() < 1e-6);
        // unselected face stays in tile 0
        let (min, _) = uv_bounds(&face_uvs(&object, 0));
        assert!(min.length() < 1e-6);
    }

    #[test]
    fn test_snap_requires_edit_mode() {
        let mut object = projected_edit_object();
        object.mode = crate::object::EditMode::Object;
        let before = object.mesh.uv_layers.clone();
        let err = UvSnapToTile::default().execute(&mut object).unwrap_err();
        assert!(matches!(err, EditError::InvalidSelection(_)));
        assert_eq!(
            before.active().unwrap().uvs,
            object.mesh.uv_layers.active().unwrap().uvs
        );
    }

    #[test]
    fn test_snap_rejects_out_of_range_tile() {
        let mut object = projected_edit_object();
        let err = UvSnapToTile {
            tile_count: 2,
            tile_index: 4,
            layer: None,
        }
        .execute(&mut object)
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidParameter { name: "tile_index", .. }));
    }

    #[test]
    fn test_snap_missing_layer() {
        let mut object = MeshObject::new("Strip", strip()).with_edit_mode();
        object.selection = MeshSelection::all(&object.mesh);
        let err = UvSnapToTile::default().execute(&mut object).unwrap_err();
        assert_eq!(err, EditError::MissingUvLayer(None));

        let err = UvFlipTiles {
            axis: FlipAxis::V,
            layer: Some("Other".into()),
        }
        .execute(&mut object)
        .unwrap_err();
        assert_eq!(err, EditError::MissingUvLayer(Some("Other".into())));
    }

    #[test]
    fn test_empty_selection_warns() {
        let mut object = projected_edit_object();
        object.selection.clear();
        let before = object.mesh.uv_layers.active().unwrap().uvs.clone();

        let ops: [&dyn Operator; 3] = [
            &UvSnapToTile::default(),
            &UvRotateTiles::default(),
            &UvFlipTiles::default(),
        ];
        for op in ops {
            assert_eq!(op.execute(&mut object).unwrap(), Outcome::Cancelled);
            assert_eq!(object.last_report().unwrap().level, ReportLevel::Warning);
        }
        assert_eq!(object.mesh.uv_layers.active().unwrap().uvs, before);
    }

    #[test]
    fn test_rotate_zero_steps_is_cancelled() {
        let mut object = projected_edit_object();
        let outcome = UvRotateTiles {
            steps: 0,
            layer: None,
        }
        .execute(&mut object)
        .unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(object.last_report().unwrap().level, ReportLevel::Info);
    }

    #[test]
    fn test_rotate_out_of_range() {
        let mut object = projected_edit_object();
        let err = UvRotateTiles {
            steps: 5,
            layer: None,
        }
        .execute(&mut object)
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidParameter { name: "steps", .. }));
    }

    #[test]
    fn test_rotate_then_inverse() {
        let mut object = projected_edit_object();
        let before = face_uvs(&object, 0);

        UvRotateTiles {
            steps: 1,
            layer: None,
        }
        .execute(&mut object)
        .unwrap();
        let rotated = face_uvs(&object, 0);
        assert!((rotated[0] - before[0]).length() > 0.01);

        UvRotateTiles {
            steps: -1,
            layer: None,
        }
        .execute(&mut object)
        .unwrap();
        for (a, b) in face_uvs(&object, 0).iter().zip(&before) {
            assert!((*a - *b).length() < 1e-5);
        }
    }

    #[test]
    fn test_flip_twice_via_operator() {
        let mut object = projected_edit_object();
        let before = face_uvs(&object, 1);
        let flip = UvFlipTiles {
            axis: FlipAxis::U,
            layer: None,
        };
        flip.execute(&mut object).unwrap();
        flip.execute(&mut object).unwrap();
        assert_eq!(face_uvs(&object, 1), before);
    }

    #[test]
    fn test_apply_leaves_input_untouched() {
        let object = projected_edit_object();
        let flipped = UvFlipTiles::default().apply(&object).unwrap();
        assert_ne!(face_uvs(&flipped, 0), face_uvs(&object, 0));
        assert!(object.reports.len() < flipped.reports.len());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_params_default_when_omitted() {
        let op: UvProjectPerFace = serde_json::from_str(r#"{"scale_mode": "WORLD"}"#).unwrap();
        assert_eq!(op.tile_count, 8);
        assert_eq!(op.scale_mode, ScaleMode::World);
        assert_eq!(op.layer, SPRITE_UV_LAYER);

        let op: UvFlipTiles = serde_json::from_str(r#"{"axis": "V"}"#).unwrap();
        assert_eq!(op.axis, FlipAxis::V);
    }
}
