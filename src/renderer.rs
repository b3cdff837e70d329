//! GPU rendering of peelable surfaces.
//!
//! [`PeelRenderer`] keeps one set of GPU resources per surface: the uploaded snapshot, uniform
//! buffers for both planes and the plane mesh. Each frame the host calls
//! [`prepare`](PeelRenderer::prepare) to sync those resources with the surface's presentation
//! state, then [`draw`](PeelRenderer::draw) inside a render pass targeting its own color attachment.

use std::num::NonZeroUsize;
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::error::RenderError;
use crate::geometry::Rect;
use crate::mesh::{MeshCache, PlaneMesh};
use crate::pipeline::{create_image_sampler, PlanePipelines, IMAGE_FORMAT};
use crate::shader::PlaneUniforms;
use crate::surface::{PeelableSurface, SurfaceId};

const MESH_CACHE_CAPACITY: usize = 16;

struct PlaneBinding {
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl PlaneBinding {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[PlaneUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            }],
        });
        Self {
            uniforms,
            bind_group,
        }
    }
}

struct SurfaceTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    generation: u64,
}

struct SurfaceGpu {
    texture: SurfaceTexture,
    front: PlaneBinding,
    reflection: PlaneBinding,
    mesh: Arc<PlaneMesh>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

pub struct PeelRenderer {
    pipelines: PlanePipelines,
    sampler: wgpu::Sampler,
    format: wgpu::TextureFormat,
    meshes: MeshCache,
    surfaces: HashMap<SurfaceId, SurfaceGpu>,
}

impl PeelRenderer {
    /// Renderer drawing into color attachments of the given format.
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        Self {
            pipelines: PlanePipelines::new(device, format),
            sampler: create_image_sampler(device),
            format,
            meshes: MeshCache::new(
                NonZeroUsize::new(MESH_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            ),
            surfaces: HashMap::new(),
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn is_prepared(&self, surface_id: SurfaceId) -> bool {
        self.surfaces.contains_key(&surface_id)
    }

    /// Uploads whatever changed since the last call: the snapshot when the surface has a new
    /// image, and the uniforms of both planes every time.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface: &PeelableSurface,
    ) -> Result<(), RenderError> {
        let id = surface.id();
        let image = surface
            .image()
            .filter(|image| image.width() > 0 && image.height() > 0)
            .ok_or(RenderError::EmptyImage(id))?;
        let limit = device.limits().max_texture_dimension_2d;
        if image.width() > limit || image.height() > limit {
            return Err(RenderError::ImageTooLarge {
                width: image.width(),
                height: image.height(),
                limit,
            });
        }

        let mesh = self
            .meshes
            .get_or_tessellate(surface.plane_size(), surface.tessellation());

        match self.surfaces.get_mut(&id) {
            Some(gpu) => {
                if gpu.texture.generation != surface.image_generation() {
                    let size = gpu.texture.texture.size();
                    if size.width == image.width() && size.height == image.height() {
                        write_image(queue, &gpu.texture.texture, image);
                        gpu.texture.generation = surface.image_generation();
                    } else {
                        gpu.texture = upload_texture(
                            device,
                            queue,
                            &self.pipelines.texture_layout,
                            &self.sampler,
                            image,
                            surface.image_generation(),
                        );
                    }
                    tracing::debug!(surface = id.0, "re-uploaded sticker image");
                }
                if !Arc::ptr_eq(&gpu.mesh, &mesh) {
                    (gpu.vertex_buffer, gpu.index_buffer) = create_mesh_buffers(device, &mesh);
                    gpu.mesh = mesh;
                }
            }
            None => {
                let texture = upload_texture(
                    device,
                    queue,
                    &self.pipelines.texture_layout,
                    &self.sampler,
                    image,
                    surface.image_generation(),
                );
                let (vertex_buffer, index_buffer) = create_mesh_buffers(device, &mesh);
                let layout = &self.pipelines.uniform_layout;
                self.surfaces.insert(
                    id,
                    SurfaceGpu {
                        texture,
                        front: PlaneBinding::new(device, layout, "front_plane_uniforms"),
                        reflection: PlaneBinding::new(device, layout, "reflection_plane_uniforms"),
                        mesh,
                        vertex_buffer,
                        index_buffer,
                    },
                );
                tracing::debug!(surface = id.0, "created surface GPU resources");
            }
        }

        let gpu = self
            .surfaces
            .get(&id)
            .ok_or(RenderError::UnknownSurface(id))?;
        let (front, reflection) = surface.uniforms();
        queue.write_buffer(&gpu.front.uniforms, 0, bytemuck::cast_slice(&[front]));
        queue.write_buffer(
            &gpu.reflection.uniforms,
            0,
            bytemuck::cast_slice(&[reflection]),
        );
        Ok(())
    }

    /// Records the reflection and then the front plane of a prepared surface into `pass`, mapped
    /// onto `viewport` (in the pixels of the pass's color attachment).
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        surface_id: SurfaceId,
        viewport: &Rect,
    ) -> Result<(), RenderError> {
        let gpu = self
            .surfaces
            .get(&surface_id)
            .ok_or(RenderError::UnknownSurface(surface_id))?;

        pass.set_viewport(
            viewport.origin.x,
            viewport.origin.y,
            viewport.size.width,
            viewport.size.height,
            0.0,
            1.0,
        );
        pass.set_bind_group(1, &gpu.texture.bind_group, &[]);
        pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        let index_count = gpu.mesh.indices.len() as u32;

        pass.set_pipeline(&self.pipelines.reflection);
        pass.set_bind_group(0, &gpu.reflection.bind_group, &[]);
        pass.draw_indexed(0..index_count, 0, 0..1);

        pass.set_pipeline(&self.pipelines.front);
        pass.set_bind_group(0, &gpu.front.bind_group, &[]);
        pass.draw_indexed(0..index_count, 0, 0..1);
        Ok(())
    }

    /// Frees the GPU resources of a surface. Returns whether there were any.
    pub fn release(&mut self, surface_id: SurfaceId) -> bool {
        let released = self.surfaces.remove(&surface_id).is_some();
        if released {
            tracing::debug!(surface = surface_id.0, "released surface GPU resources");
        }
        released
    }

    /// Frees the GPU resources of every surface for which `keep` returns `false`, returning how
    /// many were freed.
    ///
    /// Overlays get a fresh surface for every peel, so hosts sweep once per frame with the ids
    /// still alive, e.g. `renderer.retain(|id| binding.surface_id() == Some(id))`.
    pub fn retain(&mut self, mut keep: impl FnMut(SurfaceId) -> bool) -> usize {
        let before = self.surfaces.len();
        self.surfaces.retain(|id, _| keep(*id));
        let released = before - self.surfaces.len();
        if released > 0 {
            tracing::debug!(released, "released GPU resources of retired surfaces");
        }
        released
    }

    /// Renders a surface on a transparent background into a new image of the surface's scene
    /// viewport size, `bounds * scale_factor`.
    ///
    /// Fails with [`RenderError::UnsupportedFormat`] unless the renderer targets [`IMAGE_FORMAT`].
    pub fn render_to_image(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface: &PeelableSurface,
    ) -> Result<RgbaImage, RenderError> {
        if self.format != IMAGE_FORMAT {
            return Err(RenderError::UnsupportedFormat(self.format));
        }
        self.prepare(device, queue, surface)?;

        let bounds = surface.bounds();
        let viewport = surface.viewport(&Rect::from_size(bounds));
        let width = viewport.size.width.round().max(1.0) as u32;
        let height = viewport.size.height.round().max(1.0) as u32;

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("peel_offscreen_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let (unpadded_bytes_per_row, padded_bytes_per_row) = padded_bytes_per_row(width);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("peel_readback_buffer"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("peel_render_to_image"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("peel_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.draw(
                &mut pass,
                surface.id(),
                &Rect::from_size(euclid::size2(width as f32, height as f32)),
            )?;
        }
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let bytes = map_readback_buffer(device, &readback)?;
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in bytes.chunks(padded_bytes_per_row as usize).take(height as usize) {
            pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
        }
        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::Readback("pixel buffer size mismatch".to_string()))
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    image: &RgbaImage,
    generation: u64,
) -> SurfaceTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("sticker_image"),
        size: wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: IMAGE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    write_image(queue, &texture, image);

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("sticker_image_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    SurfaceTexture {
        texture,
        bind_group,
        generation,
    }
}

fn write_image(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &RgbaImage) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width()),
            rows_per_image: Some(image.height()),
        },
        wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        },
    );
}

fn create_mesh_buffers(device: &wgpu::Device, mesh: &PlaneMesh) -> (wgpu::Buffer, wgpu::Buffer) {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("plane_vertex_buffer"),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("plane_index_buffer"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    (vertex_buffer, index_buffer)
}

/// Row sizes of an RGBA8 readback: tightly packed, and padded to the copy alignment.
fn padded_bytes_per_row(width: u32) -> (u32, u32) {
    let unpadded = width * 4;
    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (unpadded, unpadded.div_ceil(alignment) * alignment)
}

fn map_readback_buffer(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<Vec<u8>, RenderError> {
    let slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        if sender.send(result).is_err() {
            tracing::warn!("failed to send map_async result from callback");
        }
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|error| RenderError::Readback(error.to_string()))?;
    receiver
        .recv()
        .map_err(|error| RenderError::Readback(error.to_string()))?
        .map_err(|error| RenderError::Readback(error.to_string()))?;

    let bytes = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readback_rows_are_aligned() {
        assert_eq!(padded_bytes_per_row(64), (256, 256));
        assert_eq!(padded_bytes_per_row(170), (680, 768));
        assert_eq!(padded_bytes_per_row(1), (4, 256));
    }
}
