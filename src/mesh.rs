use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::geometry::Size;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl PlaneVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PlaneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// A flat, subdivided plane centered on the origin and facing +z.
///
/// Texture coordinates run from `(0, 0)` at the top-left corner to `(1, 1)` at the bottom-right,
/// so `v` grows downwards while `y` grows upwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneMesh {
    pub size: Size,
    pub subdivisions: u16,
    pub vertices: Vec<PlaneVertex>,
    pub indices: Vec<u16>,
}

impl PlaneMesh {
    /// `subdivisions` quads along each edge, two triangles per quad. Needs `subdivisions < 256`
    /// so every vertex is addressable with a `u16` index.
    pub fn tessellate(size: Size, subdivisions: u16) -> Self {
        let subdivisions = subdivisions.clamp(1, 255);
        let columns = subdivisions as usize + 1;
        let mut vertices = Vec::with_capacity(columns * columns);
        for row in 0..columns {
            let v = row as f32 / subdivisions as f32;
            for column in 0..columns {
                let u = column as f32 / subdivisions as f32;
                vertices.push(PlaneVertex {
                    position: [(u - 0.5) * size.width, (0.5 - v) * size.height, 0.0],
                    normal: [0.0, 0.0, 1.0],
                    uv: [u, v],
                });
            }
        }

        let mut indices = Vec::with_capacity(subdivisions as usize * subdivisions as usize * 6);
        for row in 0..subdivisions as usize {
            for column in 0..subdivisions as usize {
                let top_left = (row * columns + column) as u16;
                let top_right = top_left + 1;
                let bottom_left = top_left + columns as u16;
                let bottom_right = bottom_left + 1;
                // Counter-clockwise when seen from +z.
                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }

        Self {
            size,
            subdivisions,
            vertices,
            indices,
        }
    }
}

type MeshKey = (u32, u32, u16);

/// Tessellated planes keyed by exact size and subdivision count.
///
/// A grid of stickers produces many planes of the same size, so tessellation is done once per
/// size and shared.
pub struct MeshCache {
    meshes: LruCache<MeshKey, Arc<PlaneMesh>>,
}

impl MeshCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            meshes: LruCache::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn get_or_tessellate(&mut self, size: Size, subdivisions: u16) -> Arc<PlaneMesh> {
        let key = (size.width.to_bits(), size.height.to_bits(), subdivisions);
        self.meshes
            .get_or_insert(key, || Arc::new(PlaneMesh::tessellate(size, subdivisions)))
            .clone()
    }
}
