//! CPU-side mesh representation used by loaders.

use anyhow::{Result, anyhow};

/// Vertex position in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Triangle as three 0-based vertex indices. Not checked against the vertex count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Face(pub [u32; 3]);

impl Face {
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self([a, b, c])
    }

    #[inline]
    pub fn indices(&self) -> [u32; 3] {
        self.0
    }
}

/// Vertex and face lists as read from a mesh file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, faces: Vec<Face>) -> Self {
        Self { vertices, faces }
    }

    /// Returns `true` if there is something to draw.
    pub fn is_drawable(&self) -> bool {
        !self.vertices.is_empty() && !self.faces.is_empty()
    }

    /// Flattened positions, tightly packed for a vertex buffer.
    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.vertices.iter().map(|v| v.to_array()).collect()
    }

    /// Flattened index buffer, three entries per face.
    pub fn indices(&self) -> Vec<u32> {
        self.faces.iter().flat_map(|f| f.indices()).collect()
    }

    /// Non-indexed triangle list: one position per face corner.
    pub fn expand(&self) -> Result<Vec<[f32; 3]>> {
        let mut out = Vec::with_capacity(self.faces.len() * 3);
        for (face_no, face) in self.faces.iter().enumerate() {
            for idx in face.indices() {
                let v = self.vertices.get(idx as usize).ok_or_else(|| {
                    anyhow!(
                        "Face {} references vertex {} but mesh has {} vertices",
                        face_no,
                        idx,
                        self.vertices.len()
                    )
                })?;
                out.push(v.to_array());
            }
        }
        Ok(out)
    }

    /// Number of faces with at least one index past the end of the vertex list.
    pub fn out_of_range_faces(&self) -> usize {
        let len = self.vertices.len();
        self.faces
            .iter()
            .filter(|f| f.indices().iter().any(|&i| i as usize >= len))
            .count()
    }
}
