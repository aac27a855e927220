use std::path::{Path, PathBuf};

use cgmath::Vector3;
use clap::Parser;
use serde::Deserialize;

use crate::error::WaterError;

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "midsummer-water", about = "Animated water plane renderer")]
pub struct Args {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory the shader and texture paths are resolved against
    #[arg(long)]
    pub res_dir: Option<PathBuf>,
    /// Grid resolution along each axis
    #[arg(long)]
    pub vertex_count: Option<u32>,
    /// World-space side length of the water plane
    #[arg(long)]
    pub size: Option<f32>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    #[default]
    Repeat,
    MirrorRepeat,
    ClampToEdge,
}

impl From<WrapMode> for wgpu::AddressMode {
    fn from(mode: WrapMode) -> Self {
        match mode {
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Linear,
    Nearest,
}

impl From<FilterMode> for wgpu::FilterMode {
    fn from(mode: FilterMode) -> Self {
        match mode {
            FilterMode::Linear => wgpu::FilterMode::Linear,
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WaterConfig {
    pub res_dir: PathBuf,
    pub vertex_count: u32,
    pub size: f32,
    pub position: [f32; 3],
    pub texture: PathBuf,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub wrap_mode: WrapMode,
    pub filter_mode: FilterMode,
    /// How many times the texture repeats across the plane.
    pub tiling: f32,
    pub flow_speed: f32,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            res_dir: PathBuf::from("res"),
            vertex_count: 512,
            size: 100.0,
            position: [0.0, -0.05, 0.0],
            texture: PathBuf::from("water_textures_2k.png"),
            vertex_shader: PathBuf::from("water_vs.wgsl"),
            fragment_shader: PathBuf::from("water_fs.wgsl"),
            wrap_mode: WrapMode::Repeat,
            filter_mode: FilterMode::Linear,
            tiling: 16.0,
            flow_speed: 0.02,
        }
    }
}

impl WaterConfig {
    pub fn position(&self) -> Vector3<f32> {
        self.position.into()
    }

    pub fn texture_path(&self) -> PathBuf {
        self.res_dir.join(&self.texture)
    }

    pub fn vertex_shader_path(&self) -> PathBuf {
        self.res_dir.join(&self.vertex_shader)
    }

    pub fn fragment_shader_path(&self) -> PathBuf {
        self.res_dir.join(&self.fragment_shader)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Fly speed in units per second.
    pub speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [50.0, 5.0, 50.0],
            fovy: 70.0,
            znear: 0.1,
            zfar: 500.0,
            speed: 10.0,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub water: WaterConfig,
    pub camera: CameraConfig,
}

impl AppConfig {
    pub fn from_toml_str(source: &str, path: &Path) -> Result<Self, WaterError> {
        toml::from_str(source).map_err(|source| WaterError::Config { path: path.to_path_buf(), source })
    }

    pub fn load(path: &Path) -> Result<Self, WaterError> {
        let source = std::fs::read_to_string(path).map_err(|source| WaterError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&source, path)
    }

    /// Defaults, then the config file, then command line flags.
    pub fn from_args(args: &Args) -> Result<Self, WaterError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(res_dir) = &args.res_dir {
            config.water.res_dir = res_dir.clone();
        }
        if let Some(vertex_count) = args.vertex_count {
            config.water.vertex_count = vertex_count;
        }
        if let Some(size) = args.size {
            config.water.size = size;
        }
        Ok(config)
    }
}
