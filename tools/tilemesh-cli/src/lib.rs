//! Pipeline runner behind the `tilemesh` binary.
//!
//! Loads an OBJ mesh (or starts from nothing when the pipeline begins with a
//! primitive), runs a JSON operator pipeline over it and writes the result
//! back out as OBJ.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rhizome_tilemesh_mesh::{
    MeshObject, MeshSelection, ObjExportOptions, ReportLevel, export_obj_with,
    import_obj_from_reader, object_value, register_ops,
};
use rhizome_tilemesh_op::{OpRegistry, OpType, OpValue, Pipeline, SerialOp};
use serde::Deserialize;

/// Pipeline files are either a bare list of ops or a `{ "ops": [...] }` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum PipelineFile {
    List(Vec<SerialOp>),
    Pipeline(Pipeline),
}

/// Creates a registry with every mesh operator.
pub fn registry() -> OpRegistry {
    let mut registry = OpRegistry::new();
    register_ops(&mut registry);
    registry
}

/// Reads a pipeline from a JSON file.
pub fn load_pipeline(path: &Path) -> Result<Pipeline> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read pipeline {}", path.display()))?;
    let file: PipelineFile = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse pipeline {}", path.display()))?;
    Ok(match file {
        PipelineFile::List(ops) => Pipeline { ops },
        PipelineFile::Pipeline(pipeline) => pipeline,
    })
}

/// Reads an OBJ file into an object named after the file stem.
pub fn load_object(path: &Path) -> Result<MeshObject> {
    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mesh = import_obj_from_reader(file)
        .with_context(|| format!("failed to import {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Object");
    Ok(MeshObject::new(name, mesh))
}

/// Options for a single pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Input OBJ; the pipeline must start from a primitive when absent.
    pub input: Option<PathBuf>,
    pub pipeline: PathBuf,
    pub output: PathBuf,
    /// Put the object in edit mode before running.
    pub edit: bool,
    /// Select every face and vertex before running.
    pub select_all: bool,
    /// UV layer written to the output; the active layer when unset.
    pub uv_layer: Option<String>,
}

/// Runs a pipeline and writes the resulting object.
///
/// Edit mode and select-all are applied to the loaded object, or to the
/// object built by the leading primitive, before the remaining operators run.
pub fn run(options: &RunOptions) -> Result<MeshObject> {
    let registry = registry();
    let pipeline = load_pipeline(&options.pipeline)?;
    let (input_type, output_type) = pipeline
        .validate(&registry)
        .context("pipeline failed validation")?;
    tracing::debug!(ops = pipeline.len(), %input_type, %output_type, "loaded pipeline");

    let unit = OpType::of::<()>("()");
    let (object, remaining) = match &options.input {
        Some(path) => {
            if input_type == unit {
                bail!("pipeline starts from a primitive and takes no --input");
            }
            (load_object(path)?, &pipeline.ops[..])
        }
        None => {
            if input_type != unit {
                bail!("pipeline expects {input_type} input; pass --input");
            }
            let head = Pipeline {
                ops: pipeline.ops[..1].to_vec(),
            };
            let object = execute(&head, OpValue::from("()", ()), &registry)?;
            (object, &pipeline.ops[1..])
        }
    };

    let mut object = prepare(object, options);
    if !remaining.is_empty() {
        let rest = Pipeline {
            ops: remaining.to_vec(),
        };
        object = execute(&rest, object_value(object), &registry)?;
    }

    for report in &object.reports {
        match report.level {
            ReportLevel::Info => tracing::info!("{}", report.message),
            ReportLevel::Warning => tracing::warn!("{}", report.message),
        }
    }

    if let Some(layer) = &options.uv_layer {
        if !object.mesh.uv_layers.contains(layer) {
            bail!("UV layer '{layer}' not found on '{}'", object.name);
        }
    }

    let obj = export_obj_with(
        &object.mesh,
        &ObjExportOptions {
            name: Some(object.name.clone()),
            uv_layer: options.uv_layer.clone(),
            vertex_colors: true,
        },
    );
    fs::write(&options.output, obj)
        .with_context(|| format!("failed to write {}", options.output.display()))?;
    tracing::info!(
        output = %options.output.display(),
        faces = object.mesh.face_count(),
        "wrote mesh"
    );
    Ok(object)
}

fn execute(pipeline: &Pipeline, input: OpValue, registry: &OpRegistry) -> Result<MeshObject> {
    pipeline
        .execute(input, registry)
        .context("pipeline failed")?
        .downcast::<MeshObject>()
        .context("pipeline did not produce a mesh object")
}

fn prepare(mut object: MeshObject, options: &RunOptions) -> MeshObject {
    if options.select_all {
        object.selection = MeshSelection::all(&object.mesh);
    }
    if options.edit {
        object = object.with_edit_mode();
    }
    object
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhizome_tilemesh_mesh::{EditMode, SPRITE_UV_LAYER, import_obj};

    const QUADS: &str = "\
v 0 0 0
v 1 0 0
v 2 0 0
v 0 1 0
v 1 1 0
v 2 1 0
f 1 2 5 4
f 2 3 6 5
";

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_run_snaps_obj_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "strip.obj", QUADS);
        let pipeline = write(
            dir.path(),
            "pipeline.json",
            r#"[
                { "type_name": "tilemesh::UvProjectPerFace" },
                { "type_name": "tilemesh::UvSnapToTile", "params": { "tile_index": 9 } }
            ]"#,
        );
        let output = dir.path().join("out.obj");

        let object = run(&RunOptions {
            input: Some(input),
            pipeline,
            output: output.clone(),
            edit: true,
            select_all: true,
            uv_layer: Some(SPRITE_UV_LAYER.to_string()),
        })
        .unwrap();
        assert_eq!(object.name, "strip");

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("o strip"));
        let mesh = import_obj(&written).unwrap();
        let uvs = &mesh.uv_layers.active().unwrap().uvs;
        assert_eq!(uvs.len(), 8);
        for uv in uvs {
            assert!(uv.x >= 0.125 - 1e-6 && uv.x <= 0.25 + 1e-6);
            assert!(uv.y >= 0.125 - 1e-6 && uv.y <= 0.25 + 1e-6);
        }
    }

    #[test]
    fn test_run_from_primitive() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = write(
            dir.path(),
            "pipeline.json",
            r#"{ "ops": [
                { "type_name": "tilemesh::Cuboid" },
                { "type_name": "tilemesh::DotShade" }
            ] }"#,
        );
        let output = dir.path().join("cube.obj");

        let object = run(&RunOptions {
            pipeline,
            output: output.clone(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(object.mesh.face_count(), 6);
        assert!(fs::read_to_string(&output).unwrap().contains("f "));
    }

    #[test]
    fn test_run_rejects_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = write(
            dir.path(),
            "pipeline.json",
            r#"[{ "type_name": "tilemesh::UvFlipTiles" }]"#,
        );
        let err = run(&RunOptions {
            pipeline,
            output: dir.path().join("out.obj"),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("expects"));
    }

    #[test]
    fn test_run_prepares_primitive_before_edit_ops() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = write(
            dir.path(),
            "pipeline.json",
            r#"[
                { "type_name": "tilemesh::Grid" },
                { "type_name": "tilemesh::UvProjectPerFace" },
                { "type_name": "tilemesh::UvSnapToTile", "params": { "tile_index": 9 } }
            ]"#,
        );

        let object = run(&RunOptions {
            pipeline,
            output: dir.path().join("grid.obj"),
            edit: true,
            select_all: true,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(object.mode, EditMode::Edit);
        assert_eq!(object.selection.faces.len(), 16);
        let uvs = &object.mesh.uv_layers.get(SPRITE_UV_LAYER).unwrap().uvs;
        for uv in uvs {
            assert!(uv.x >= 0.125 - 1e-6 && uv.x <= 0.25 + 1e-6);
            assert!(uv.y >= 0.125 - 1e-6 && uv.y <= 0.25 + 1e-6);
        }
    }

    #[test]
    fn test_run_rejects_input_for_primitive_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "strip.obj", QUADS);
        let pipeline = write(
            dir.path(),
            "pipeline.json",
            r#"[{ "type_name": "tilemesh::Cuboid" }]"#,
        );
        let err = run(&RunOptions {
            input: Some(input),
            pipeline,
            output: dir.path().join("out.obj"),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("no --input"));
    }

    #[test]
    fn test_run_rejects_unknown_uv_layer() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "strip.obj", QUADS);
        let pipeline = write(
            dir.path(),
            "pipeline.json",
            r#"[{ "type_name": "tilemesh::UvProjectPerFace" }]"#,
        );
        let output = dir.path().join("out.obj");
        let err = run(&RunOptions {
            input: Some(input),
            pipeline,
            output: output.clone(),
            uv_layer: Some("UVTypo".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("UVTypo"));
        assert!(!output.exists());
    }

    #[test]
    fn test_load_pipeline_reports_unknown_op() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = write(
            dir.path(),
            "pipeline.json",
            r#"[{ "type_name": "tilemesh::Bake" }]"#,
        );
        let loaded = load_pipeline(&pipeline).unwrap();
        assert!(loaded.validate(&registry()).is_err());
    }

    #[test]
    fn test_load_pipeline_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = write(dir.path(), "pipeline.json", "{ nope");
        let err = load_pipeline(&pipeline).unwrap_err();
        assert!(err.to_string().contains("failed to parse pipeline"));
    }
}
