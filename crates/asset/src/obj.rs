//! Line-oriented OBJ loader for position-only triangle meshes.
//!
//! The expected layout is a fixed-size header, then `v x y z` records and
//! face records with three 1-based vertex indices. Normals, texture
//! coordinates and polygons wider than a triangle are not supported.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow};

use crate::mesh::{Face, MeshData, Vertex};

/// How non-vertex lines are classified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaceRule {
    /// Every line whose first token is not `v` is a face record.
    #[default]
    AnyNonVertex,
    /// Only `f` lines are faces; other directives are ignored.
    Explicit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjOptions {
    /// Lines skipped unconditionally before parsing starts.
    pub header_lines: usize,
    pub face_rule: FaceRule,
}

impl ObjOptions {
    pub const DEFAULT_HEADER_LINES: usize = 3;
}

impl Default for ObjOptions {
    fn default() -> Self {
        Self {
            header_lines: Self::DEFAULT_HEADER_LINES,
            face_rule: FaceRule::default(),
        }
    }
}

/// Load an OBJ mesh from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>, options: ObjOptions) -> Result<MeshData> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    let mesh = load_obj_from_reader(BufReader::new(file), options)
        .with_context(|| format!("Failed to parse OBJ file: {}", path.display()))?;
    log::info!(
        "Loaded {}: {} vertices, {} faces",
        path.display(),
        mesh.vertices.len(),
        mesh.faces.len()
    );
    Ok(mesh)
}

/// Load an OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R, options: ObjOptions) -> Result<MeshData> {
    parse_obj(reader, options)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str, options: ObjOptions) -> Result<MeshData> {
    parse_obj(io::Cursor::new(contents), options)
}

fn parse_obj<R: BufRead>(reader: R, options: ObjOptions) -> Result<MeshData> {
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut faces: Vec<Face> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        if line_no < options.header_lines {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match (tag, options.face_rule) {
            ("v", _) => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                vertices.push(Vertex::new(x, y, z));
            }
            ("f", _) | (_, FaceRule::AnyNonVertex) => {
                let a = parse_index(parts.next(), line_no, "first index")?;
                let b = parse_index(parts.next(), line_no, "second index")?;
                let c = parse_index(parts.next(), line_no, "third index")?;
                faces.push(Face::new(a, b, c));
            }
            _ => {
                log::trace!("Skipping '{}' directive on line {}", tag, line_no + 1);
            }
        }
    }

    Ok(MeshData::new(vertices, faces))
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Failed to parse {} on line {}", what, line_no + 1))
}

/// Parse a 1-based face element (`v`, `v/vt` or `v/vt/vn`) into a 0-based index.
fn parse_index(value: Option<&str>, line_no: usize, what: &str) -> Result<u32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    let head = token.split('/').next().unwrap_or(token);
    let raw = head
        .parse::<i64>()
        .with_context(|| format!("Invalid index '{}' on line {}", token, line_no + 1))?;
    if raw < 1 {
        anyhow::bail!("OBJ indices are 1-based; found {} on line {}", raw, line_no + 1);
    }
    u32::try_from(raw - 1)
        .map_err(|_| anyhow!("Index {} too large on line {}", raw, line_no + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLES: &str = "\
# exported mesh
# vertices: 4
# faces: 2
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
v 0.0 0.0 1.0
f 1 2 3
f 1 3 4
";

    #[test]
    fn counts_match_record_lines() {
        let mesh = load_obj_from_str(TRIANGLES, ObjOptions::default()).expect("parse");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.vertices[1], Vertex::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn face_indices_become_zero_based() {
        let mesh = load_obj_from_str(TRIANGLES, ObjOptions::default()).expect("parse");
        assert_eq!(mesh.faces, vec![Face::new(0, 1, 2), Face::new(0, 2, 3)]);
    }

    #[test]
    fn header_lines_are_skipped_even_when_they_look_like_records() {
        let src = "v 9 9 9\nv 9 9 9\nf 1 1 1\nv 1 2 3\n";
        let mesh = load_obj_from_str(src, ObjOptions::default()).expect("parse");
        assert_eq!(mesh.vertices, vec![Vertex::new(1.0, 2.0, 3.0)]);
        assert!(mesh.faces.is_empty());
    }

    #[test]
    fn header_only_input_is_empty() {
        let mesh = load_obj_from_str("a\nb\nc\n", ObjOptions::default()).expect("parse");
        assert!(mesh.vertices.is_empty());
        assert!(mesh.faces.is_empty());

        let mesh = load_obj_from_str("", ObjOptions::default()).expect("parse empty");
        assert_eq!(mesh, MeshData::default());
    }

    #[test]
    fn loading_twice_is_identical() {
        let first = load_obj_from_str(TRIANGLES, ObjOptions::default()).expect("first");
        let second = load_obj_from_str(TRIANGLES, ObjOptions::default()).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn any_non_vertex_tag_is_a_face() {
        let src = "h\nh\nh\nv 0 0 0\nv 1 0 0\nv 0 1 0\nt 1 2 3\nf 3 2 1\n";
        let mesh = load_obj_from_str(src, ObjOptions::default()).expect("parse");
        assert_eq!(mesh.faces, vec![Face::new(0, 1, 2), Face::new(2, 1, 0)]);
    }

    #[test]
    fn explicit_rule_ignores_other_directives() {
        let src = "h\nh\nh\no teapot\nv 0 0 0\nv 1 0 0\nv 0 1 0\ns off\nf 1 2 3\n";
        let options = ObjOptions {
            face_rule: FaceRule::Explicit,
            ..ObjOptions::default()
        };
        let mesh = load_obj_from_str(src, options).expect("parse");
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.faces, vec![Face::new(0, 1, 2)]);

        assert!(load_obj_from_str(src, ObjOptions::default()).is_err());
    }

    #[test]
    fn slash_elements_use_the_position_index() {
        let src = "h\nh\nh\nf 4/1/1 5//2 6/3\n";
        let mesh = load_obj_from_str(src, ObjOptions::default()).expect("parse");
        assert_eq!(mesh.faces, vec![Face::new(3, 4, 5)]);
    }

    #[test]
    fn blank_lines_are_not_records() {
        let src = "h\nh\nh\n\nv 0 0 0\n   \nf 1 1 1\n";
        let mesh = load_obj_from_str(src, ObjOptions::default()).expect("parse");
        assert_eq!(mesh.vertices.len(), 1);
        assert_eq!(mesh.faces.len(), 1);
    }

    #[test]
    fn custom_header_length() {
        let options = ObjOptions {
            header_lines: 0,
            ..ObjOptions::default()
        };
        let mesh = load_obj_from_str("v 1 1 1\nf 1 1 1\n", options).expect("parse");
        assert_eq!(mesh.vertices.len(), 1);
        assert_eq!(mesh.faces.len(), 1);
    }

    #[test]
    fn malformed_lines_report_their_line_number() {
        let err = load_obj_from_str("h\nh\nh\nv 1.0 nope 2.0\n", ObjOptions::default())
            .expect_err("bad float");
        assert!(format!("{err:#}").contains("line 4"));

        let err = load_obj_from_str("h\nh\nh\nf 1 2\n", ObjOptions::default())
            .expect_err("missing index");
        assert!(format!("{err:#}").contains("third index"));

        assert!(load_obj_from_str("h\nh\nh\nf 0 1 2\n", ObjOptions::default()).is_err());
    }

    #[test]
    fn indices_are_not_bounds_checked() {
        let src = "h\nh\nh\nv 0 0 0\nf 1 2 300\n";
        let mesh = load_obj_from_str(src, ObjOptions::default()).expect("parse");
        assert_eq!(mesh.faces, vec![Face::new(0, 1, 299)]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_obj_from_path("definitely/not/here.obj", ObjOptions::default())
            .expect_err("missing file");
        assert!(format!("{err}").contains("Failed to open OBJ file"));
    }
}
