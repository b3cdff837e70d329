use thiserror::Error;

use crate::surface::SurfaceId;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface {0:?} has no image to render")]
    EmptyImage(SurfaceId),
    #[error("image of {width}x{height} exceeds the device texture limit of {limit}")]
    ImageTooLarge { width: u32, height: u32, limit: u32 },
    #[error("no GPU resources prepared for surface {0:?}")]
    UnknownSurface(SurfaceId),
    #[error("offscreen rendering needs an Rgba8UnormSrgb renderer, not {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),
    #[error("failed to read back rendered pixels: {0}")]
    Readback(String),
}
