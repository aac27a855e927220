use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaterError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("water texture not found at {path}")]
    TextureNotFound { path: PathBuf },
    #[error("failed to decode image {path}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("shader source not found at {path}")]
    ShaderNotFound { path: PathBuf },
    #[error("invalid water grid: vertex_count {vertex_count}, size {size}")]
    InvalidGrid { vertex_count: u32, size: f32 },
    #[error("water grid of {vertex_count} per side needs a {bytes} byte buffer, device limit is {limit}")]
    GridTooLarge { vertex_count: u32, bytes: u64, limit: u64 },
    #[error("image decode task failed")]
    DecodeTask(#[from] tokio::task::JoinError),
    #[error("invalid config {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no suitable graphics adapter found")]
    NoAdapter,
    #[error("failed to request graphics device")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create window surface")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
}
