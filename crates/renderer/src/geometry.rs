//! Mesh data shaped for the GPU: indexed or expanded triangle lists.

use std::str::FromStr;

use anyhow::Result;
use asset::mesh::MeshData;
use bytemuck::{Pod, Zeroable};
use wgpu::{
    Buffer, BufferUsages, Device, IndexFormat, RenderPass, VertexBufferLayout, VertexStepMode,
    util::{BufferInitDescriptor, DeviceExt},
};

/// Vertex: position only.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
}

impl Vertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
    };
}

/// How faces are turned into a draw call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawMode {
    /// Shared vertices plus a `u32` index buffer.
    #[default]
    Indexed,
    /// One vertex per face corner, no index buffer.
    Arrays,
}

impl FromStr for DrawMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "indexed" | "elements" => Ok(DrawMode::Indexed),
            "arrays" | "expanded" => Ok(DrawMode::Arrays),
            other => Err(format!("unknown draw mode '{other}'")),
        }
    }
}

/// CPU-side geometry ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryData {
    pub vertices: Vec<Vertex>,
    pub indices: Option<Vec<u32>>,
}

impl GeometryData {
    /// Build buffers for `mesh` in the given mode.
    pub fn from_mesh(mesh: &MeshData, mode: DrawMode) -> Result<Self> {
        let geometry = match mode {
            DrawMode::Indexed => Self {
                vertices: to_vertices(mesh.positions()),
                indices: Some(mesh.indices()),
            },
            DrawMode::Arrays => Self {
                vertices: to_vertices(mesh.expand()?),
                indices: None,
            },
        };
        Ok(geometry)
    }

    /// Static triangle drawn when no mesh is available.
    pub fn fallback_triangle() -> Self {
        Self {
            vertices: to_vertices(vec![[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [-1.0, 1.0, 0.0]]),
            indices: None,
        }
    }

    /// Like [`GeometryData::from_mesh`], but degrades to the fallback triangle
    /// for an empty or unusable mesh.
    pub fn prepare(mesh: &MeshData, mode: DrawMode) -> Self {
        if !mesh.is_drawable() {
            log::warn!("Mesh has nothing to draw; using the fallback triangle");
            return Self::fallback_triangle();
        }

        let dangling = mesh.out_of_range_faces();
        if dangling > 0 {
            log::warn!(
                "{} of {} faces reference vertices past the end ({} vertices)",
                dangling,
                mesh.faces.len(),
                mesh.vertices.len()
            );
        }

        match Self::from_mesh(mesh, mode) {
            Ok(geometry) => geometry,
            Err(e) => {
                log::warn!("Cannot build {mode:?} geometry: {e:#}; using the fallback triangle");
                Self::fallback_triangle()
            }
        }
    }

    /// Number of vertices (or indices) one draw call covers.
    pub fn draw_count(&self) -> u32 {
        match &self.indices {
            Some(indices) => indices.len() as u32,
            None => self.vertices.len() as u32,
        }
    }

    pub fn upload(&self, device: &Device) -> GpuGeometry {
        let vertex_buf = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Mesh VB"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = self.indices.as_ref().map(|indices| {
            device.create_buffer_init(&BufferInitDescriptor {
                label: Some("Mesh IB"),
                contents: bytemuck::cast_slice(indices),
                usage: BufferUsages::INDEX,
            })
        });

        log::info!(
            "Uploaded {} vertices{} ({} per draw)",
            self.vertices.len(),
            if index_buf.is_some() { " + indices" } else { "" },
            self.draw_count()
        );

        GpuGeometry {
            vertex_buf,
            index_buf,
            count: self.draw_count(),
        }
    }
}

fn to_vertices(positions: Vec<[f32; 3]>) -> Vec<Vertex> {
    positions.into_iter().map(|pos| Vertex { pos }).collect()
}

/// Uploaded geometry plus the draw call that goes with it.
pub struct GpuGeometry {
    vertex_buf: Buffer,
    index_buf: Option<Buffer>,
    count: u32,
}

impl GpuGeometry {
    pub fn draw(&self, rpass: &mut RenderPass<'_>) {
        rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        match &self.index_buf {
            Some(index_buf) => {
                rpass.set_index_buffer(index_buf.slice(..), IndexFormat::Uint32);
                rpass.draw_indexed(0..self.count, 0, 0..1);
            }
            None => rpass.draw(0..self.count, 0..1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::mesh::{Face, Vertex as MeshVertex};

    fn pyramid() -> MeshData {
        MeshData::new(
            vec![
                MeshVertex::new(0.0, 1.0, 0.0),
                MeshVertex::new(-1.0, 0.0, 1.0),
                MeshVertex::new(1.0, 0.0, 1.0),
                MeshVertex::new(0.0, 0.0, -1.0),
            ],
            vec![Face::new(0, 1, 2), Face::new(0, 2, 3), Face::new(0, 3, 1)],
        )
    }

    #[test]
    fn indexed_keeps_shared_vertices() {
        let g = GeometryData::from_mesh(&pyramid(), DrawMode::Indexed).expect("indexed");
        assert_eq!(g.vertices.len(), 4);
        assert_eq!(g.indices.as_deref(), Some(&[0, 1, 2, 0, 2, 3, 0, 3, 1][..]));
        assert_eq!(g.draw_count(), 9);
    }

    #[test]
    fn arrays_expand_every_corner() {
        let g = GeometryData::from_mesh(&pyramid(), DrawMode::Arrays).expect("arrays");
        assert!(g.indices.is_none());
        assert_eq!(g.vertices.len(), 9);
        assert_eq!(g.vertices[4].pos, [1.0, 0.0, 1.0]);
        assert_eq!(g.draw_count(), 9);
    }

    #[test]
    fn empty_mesh_falls_back_to_triangle() {
        let g = GeometryData::prepare(&MeshData::default(), DrawMode::Indexed);
        assert_eq!(g, GeometryData::fallback_triangle());
        assert_eq!(g.draw_count(), 3);
    }

    #[test]
    fn dangling_index_in_arrays_mode_falls_back() {
        let mut mesh = pyramid();
        mesh.faces.push(Face::new(0, 1, 42));
        let g = GeometryData::prepare(&mesh, DrawMode::Arrays);
        assert_eq!(g, GeometryData::fallback_triangle());

        let g = GeometryData::prepare(&mesh, DrawMode::Indexed);
        assert_eq!(g.draw_count(), 12);
    }

    #[test]
    fn vertex_stride_is_three_floats() {
        assert_eq!(Vertex::LAYOUT.array_stride, 12);
    }

    #[test]
    fn draw_mode_parses_aliases() {
        assert_eq!("Indexed".parse::<DrawMode>(), Ok(DrawMode::Indexed));
        assert_eq!("arrays".parse::<DrawMode>(), Ok(DrawMode::Arrays));
        assert!("strips".parse::<DrawMode>().is_err());
    }
}
