//! OBJ file format import and export.
//!
//! Supports:
//! - Vertex positions (v), with optional trailing RGB vertex colors
//! - Texture coordinates (vt), stored per corner
//! - Vertex normals (vn), validated but recomputed from geometry
//! - Polygon faces (f) of any size, kept as n-gons
//! - Negative (relative) indices
//!
//! # Example
//!
//! ```ignore
//! use rhizome_tilemesh_mesh::{Cuboid, export_obj, import_obj};
//!
//! let cube = Cuboid::default().build();
//! let obj_string = export_obj(&cube);
//!
//! let imported = import_obj(&obj_string).unwrap();
//! ```

use std::fmt::{self, Write as FmtWrite};
use std::io::{BufRead, BufReader, Read};

use glam::{Vec2, Vec3};
use rhizome_tilemesh_color::Rgba;
use rhizome_tilemesh_core::AttributeDomain;
use thiserror::Error;

use crate::Mesh;
use crate::layers::{ColorLayer, ColorType, UvLayer};

/// UV layer created for imported texture coordinates.
pub const IMPORTED_UV_LAYER: &str = "UVMap";

/// Color layer created for imported vertex colors.
pub const IMPORTED_COLOR_LAYER: &str = "Col";

/// Errors that can occur during OBJ import.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjError {
    /// Invalid or malformed line in the OBJ file.
    #[error("invalid line: {0}")]
    InvalidLine(String),
    /// Face references a vertex index that doesn't exist.
    #[error("invalid vertex index: {0}")]
    InvalidVertexIndex(i64),
    /// Face references a normal index that doesn't exist.
    #[error("invalid normal index: {0}")]
    InvalidNormalIndex(i64),
    /// Face references a texture coordinate index that doesn't exist.
    #[error("invalid texture coordinate index: {0}")]
    InvalidTexCoordIndex(i64),
    /// Failed to parse a number.
    #[error("parse error: {0}")]
    ParseError(String),
    /// Face has fewer than 3 vertices.
    #[error("invalid face: {0}")]
    InvalidFace(String),
    /// The reader failed.
    #[error("read error: {0}")]
    Io(String),
}

/// Imports a mesh from OBJ format string.
pub fn import_obj(obj_str: &str) -> Result<Mesh, ObjError> {
    import_obj_from_reader(obj_str.as_bytes())
}

/// Imports a mesh from any reader containing OBJ data.
pub fn import_obj_from_reader<R: Read>(reader: R) -> Result<Mesh, ObjError> {
    let reader = BufReader::new(reader);

    let mut positions: Vec<Vec3> = Vec::new();
    let mut colors: Vec<Option<Rgba>> = Vec::new();
    let mut normal_count = 0usize;
    let mut tex_coords: Vec<Vec2> = Vec::new();

    let mut faces: Vec<Vec<u32>> = Vec::new();
    let mut corner_uvs: Vec<Option<Vec2>> = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|e| ObjError::Io(e.to_string()))?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "v" => {
                if parts.len() < 4 {
                    return Err(ObjError::InvalidLine(line.to_string()));
                }
                positions.push(Vec3::new(
                    parse_float(parts[1])?,
                    parse_float(parts[2])?,
                    parse_float(parts[3])?,
                ));
                colors.push(if parts.len() >= 7 {
                    Some(Rgba::new(
                        parse_float(parts[4])?,
                        parse_float(parts[5])?,
                        parse_float(parts[6])?,
                        1.0,
                    ))
                } else {
                    None
                });
            }
            "vn" => {
                if parts.len() < 4 {
                    return Err(ObjError::InvalidLine(line.to_string()));
                }
                for part in &parts[1..4] {
                    parse_float(part)?;
                }
                normal_count += 1;
            }
            "vt" => {
                if parts.len() < 3 {
                    return Err(ObjError::InvalidLine(line.to_string()));
                }
                tex_coords.push(Vec2::new(parse_float(parts[1])?, parse_float(parts[2])?));
            }
            "f" => {
                if parts.len() < 4 {
                    return Err(ObjError::InvalidFace(format!(
                        "face has {} corners, need at least 3",
                        parts.len() - 1
                    )));
                }

                let mut face = Vec::with_capacity(parts.len() - 1);
                for part in &parts[1..] {
                    let (pos, tex, norm) = parse_face_vertex(part)?;

                    let pos_idx = resolve_index(pos, positions.len())
                        .ok_or(ObjError::InvalidVertexIndex(pos))?;
                    let uv = match tex {
                        Some(ti) => Some(
                            resolve_index(ti, tex_coords.len())
                                .map(|i| tex_coords[i])
                                .ok_or(ObjError::InvalidTexCoordIndex(ti))?,
                        ),
                        None => None,
                    };
                    if let Some(ni) = norm {
                        resolve_index(ni, normal_count).ok_or(ObjError::InvalidNormalIndex(ni))?;
                    }

                    face.push(pos_idx as u32);
                    corner_uvs.push(uv);
                }
                faces.push(face);
            }
            // Ignore other commands (mtllib, usemtl, g, o, s, l, etc.)
            _ => {}
        }
    }

    let mut mesh = Mesh::from_faces(positions, &faces);

    if corner_uvs.iter().any(Option::is_some) {
        let mut layer = UvLayer::new(IMPORTED_UV_LAYER, mesh.loop_count());
        for (slot, uv) in layer.uvs.iter_mut().zip(&corner_uvs) {
            *slot = uv.unwrap_or(Vec2::ZERO);
        }
        mesh.uv_layers.add(layer);
    }

    if colors.iter().any(Option::is_some) {
        let mut layer = ColorLayer::for_mesh(
            IMPORTED_COLOR_LAYER,
            AttributeDomain::Point,
            ColorType::Float,
            &mesh,
        );
        layer.assign(
            colors
                .iter()
                .map(|c| c.unwrap_or(ColorLayer::DEFAULT_COLOR)),
        );
        mesh.color_layers.add(layer);
    }

    tracing::debug!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        uv_layers = mesh.uv_layers.len(),
        "imported OBJ"
    );
    Ok(mesh)
}

fn parse_float(s: &str) -> Result<f32, ObjError> {
    s.parse::<f32>()
        .map_err(|e| ObjError::ParseError(format!("'{s}': {e}")))
}

fn parse_index(s: &str) -> Result<i64, ObjError> {
    s.parse::<i64>()
        .map_err(|e| ObjError::ParseError(format!("'{s}': {e}")))
}

/// Resolves a 1-based (or negative, relative) OBJ index into `0..len`.
fn resolve_index(raw: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = match raw {
        0 => return None,
        i if i > 0 => i - 1,
        i => len + i,
    };
    (0..len).contains(&index).then_some(index as usize)
}

/// Parses a face vertex specification (e.g., "1/2/3" or "1//3" or "1").
fn parse_face_vertex(s: &str) -> Result<(i64, Option<i64>, Option<i64>), ObjError> {
    let mut parts = s.split('/');

    let pos_idx = parse_index(parts.next().unwrap_or_default())?;

    let tex_idx = match parts.next() {
        Some(t) if !t.is_empty() => Some(parse_index(t)?),
        _ => None,
    };

    let norm_idx = match parts.next() {
        Some(n) if !n.is_empty() => Some(parse_index(n)?),
        _ => None,
    };

    Ok((pos_idx, tex_idx, norm_idx))
}

/// Options for [`export_obj_with`].
#[derive(Debug, Clone, Default)]
pub struct ObjExportOptions {
    /// Object name written as an `o` line.
    pub name: Option<String>,
    /// UV layer to write; the active layer when unset.
    pub uv_layer: Option<String>,
    /// Write the active point-domain color layer as vertex colors.
    pub vertex_colors: bool,
}

/// Exports a mesh to OBJ format string.
pub fn export_obj(mesh: &Mesh) -> String {
    export_obj_with(
        mesh,
        &ObjExportOptions {
            vertex_colors: true,
            ..Default::default()
        },
    )
}

/// Exports a mesh to OBJ format string with an optional object name.
pub fn export_obj_with_name(mesh: &Mesh, name: Option<&str>) -> String {
    export_obj_with(
        mesh,
        &ObjExportOptions {
            name: name.map(str::to_string),
            vertex_colors: true,
            ..Default::default()
        },
    )
}

/// Exports a mesh to OBJ format string.
pub fn export_obj_with(mesh: &Mesh, options: &ObjExportOptions) -> String {
    let mut output = String::new();
    // Formatting into a String cannot fail.
    let _ = write_obj(&mut output, mesh, options);
    output
}

/// Writes a mesh as OBJ text.
///
/// UVs are written one `vt` per loop, so faces reference `v/vt` pairs.
pub fn write_obj<W: FmtWrite>(out: &mut W, mesh: &Mesh, options: &ObjExportOptions) -> fmt::Result {
    writeln!(out, "# OBJ exported by tilemesh")?;
    if let Some(name) = &options.name {
        writeln!(out, "o {}", name)?;
    }
    writeln!(out)?;

    let colors = options
        .vertex_colors
        .then(|| mesh.color_layers.active())
        .flatten()
        .filter(|layer| layer.domain == AttributeDomain::Point && layer.len() == mesh.vertex_count());

    for (i, pos) in mesh.positions.iter().enumerate() {
        match colors.and_then(|layer| layer.get(i)) {
            Some(c) => writeln!(out, "v {} {} {} {} {} {}", pos.x, pos.y, pos.z, c.r, c.g, c.b)?,
            None => writeln!(out, "v {} {} {}", pos.x, pos.y, pos.z)?,
        }
    }
    writeln!(out)?;

    let uvs = mesh
        .uv_layers
        .resolve(options.uv_layer.as_deref())
        .and_then(|i| mesh.uv_layers.by_index(i))
        .filter(|layer| layer.uvs.len() == mesh.loop_count());

    if let Some(layer) = uvs {
        for uv in &layer.uvs {
            writeln!(out, "vt {} {}", uv.x, uv.y)?;
        }
        writeln!(out)?;
    }

    for face in 0..mesh.face_count() {
        write!(out, "f")?;
        for corner in mesh.face_loops(face) {
            // OBJ uses 1-based indexing
            let v = mesh.corner_verts[corner] + 1;
            if uvs.is_some() {
                write!(out, " {}/{}", v, corner + 1)?;
            } else {
                write!(out, " {}", v)?;
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

    #[test]
    fn test_import_keeps_ngons() {
        let mesh = import_obj(QUAD).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.face_verts(0), &[0, 1, 2, 3]);
        assert!(mesh.uv_layers.is_empty());
        assert!(mesh.color_layers.is_empty());
    }

    #[test]
    fn test_import_with_uvs_per_corner() {
        let obj = "\
v 0 0 0
v 1 0 0
v 1 1 0
vt 0 0
vt 1 0
vt 0.5 1
f 1/3 2/2 3/1
";
        let mesh = import_obj(obj).unwrap();
        let layer = mesh.uv_layers.active().unwrap();
        assert_eq!(layer.name, IMPORTED_UV_LAYER);
        assert_eq!(layer.uvs, vec![Vec2::new(0.5, 1.0), Vec2::X, Vec2::ZERO]);
    }

    #[test]
    fn test_import_with_normals_and_uvs() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vn 0 0 1
f 1/1/1 2/1/1 3//1
";
        let mesh = import_obj(obj).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.uv_layers.active().unwrap().uvs.len(), 3);
    }

    #[test]
    fn test_import_vertex_colors() {
        let obj = "\
v 0 0 0 1 0 0
v 1 0 0 0 1 0
v 0 1 0
f 1 2 3
";
        let mesh = import_obj(obj).unwrap();
        let layer = mesh.color_layers.get(IMPORTED_COLOR_LAYER).unwrap();
        assert_eq!(layer.domain, AttributeDomain::Point);
        assert_eq!(layer.get(0), Some(Rgba::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(layer.get(2), Some(ColorLayer::DEFAULT_COLOR));
    }

    #[test]
    fn test_import_negative_indices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = import_obj(obj).unwrap();
        assert_eq!(mesh.face_verts(0), &[0, 1, 2]);
    }

    #[test]
    fn test_import_invalid_vertex_index() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 5\n";
        assert_eq!(import_obj(obj).unwrap_err(), ObjError::InvalidVertexIndex(5));

        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n";
        assert_eq!(import_obj(obj).unwrap_err(), ObjError::InvalidVertexIndex(0));
    }

    #[test]
    fn test_import_invalid_tex_and_normal_index() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1 2 3\n";
        assert_eq!(import_obj(obj).unwrap_err(), ObjError::InvalidTexCoordIndex(1));

        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1//2 2 3\n";
        assert_eq!(import_obj(obj).unwrap_err(), ObjError::InvalidNormalIndex(2));
    }

    #[test]
    fn test_import_short_face() {
        let obj = "v 0 0 0\nv 1 0 0\nf 1 2\n";
        assert!(matches!(import_obj(obj), Err(ObjError::InvalidFace(_))));
    }

    #[test]
    fn test_import_bad_number() {
        let obj = "v 0 zero 0\n";
        assert!(matches!(import_obj(obj), Err(ObjError::ParseError(_))));
        let obj = "v 0 0\n";
        assert!(matches!(import_obj(obj), Err(ObjError::InvalidLine(_))));
    }

    #[test]
    fn test_import_comments_and_empty_lines() {
        let obj = "# comment\n\nmtllib a.mtl\no Quad\n".to_string() + QUAD + "s off\n";
        let mesh = import_obj(&obj).unwrap();
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn test_export_writes_corner_uvs() {
        let mut mesh = import_obj(QUAD).unwrap();
        let mut layer = UvLayer::new("UVSprite", mesh.loop_count());
        layer.uvs[2] = Vec2::splat(0.125);
        mesh.uv_layers.add(layer);

        let obj = export_obj_with_name(&mesh, Some("Quad"));
        assert!(obj.starts_with("# OBJ exported by tilemesh\no Quad\n"));
        assert!(obj.contains("vt 0.125 0.125\n"));
        assert!(obj.contains("f 1/1 2/2 3/3 4/4\n"));
    }

    #[test]
    fn test_export_without_uvs() {
        let mesh = import_obj(QUAD).unwrap();
        let obj = export_obj(&mesh);
        assert!(!obj.contains("vt"));
        assert!(obj.contains("f 1 2 3 4\n"));
    }

    #[test]
    fn test_export_vertex_colors() {
        let obj = "v 0 0 0 1 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = import_obj(obj).unwrap();
        let exported = export_obj(&mesh);
        assert!(exported.contains("v 0 0 0 1 0 0\n"));

        let plain = export_obj_with(&mesh, &ObjExportOptions::default());
        assert!(plain.contains("v 0 0 0\n"));
    }

    #[test]
    fn test_roundtrip_uvs() {
        let obj = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 0.25 0
vt 0.25 0.25
vt 0 0.25
f 1/1 2/2 3/3 4/4
";
        let mesh = import_obj(obj).unwrap();
        let again = import_obj(&export_obj(&mesh)).unwrap();
        assert_eq!(again.positions, mesh.positions);
        assert_eq!(
            again.uv_layers.active().unwrap().uvs,
            mesh.uv_layers.active().unwrap().uvs
        );
    }
}
