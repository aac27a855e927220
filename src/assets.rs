use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use image::{DynamicImage, GenericImageView};

use crate::{config::WaterConfig, error::WaterError};

/// Everything Water needs from disk, read before any GPU work starts.
pub struct WaterAssets {
    pub vertex_source: String,
    pub fragment_source: String,
    pub texture: DynamicImage,
}

impl WaterAssets {
    pub async fn load(config: &WaterConfig) -> Result<Self, WaterError> {
        let vertex_path = config.vertex_shader_path();
        let fragment_path = config.fragment_shader_path();
        let texture_path = config.texture_path();
        let (vertex_source, fragment_source, texture) = tokio::try_join!(
            read_shader(&vertex_path),
            read_shader(&fragment_path),
            load_texture_image(&texture_path),
        )?;
        log::info!(
            "Loaded water assets: {} ({:?}), {}, {}",
            texture_path.display(),
            texture.dimensions(),
            vertex_path.display(),
            fragment_path.display()
        );
        Ok(Self { vertex_source, fragment_source, texture })
    }
}

pub async fn read_shader(path: &Path) -> Result<String, WaterError> {
    tokio::fs::read_to_string(path).await.map_err(|source| match source.kind() {
        ErrorKind::NotFound => WaterError::ShaderNotFound { path: path.to_path_buf() },
        _ => WaterError::Io { path: path.to_path_buf(), source },
    })
}

pub async fn load_texture_image(path: &Path) -> Result<DynamicImage, WaterError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| match source.kind() {
        ErrorKind::NotFound => WaterError::TextureNotFound { path: path.to_path_buf() },
        _ => WaterError::Io { path: path.to_path_buf(), source },
    })?;
    decode_image_blocking(path.to_path_buf(), bytes).await
}

/// Decodes on tokio's blocking pool so runtime workers keep polling other tasks.
pub async fn decode_image_blocking(path: PathBuf, bytes: Vec<u8>) -> Result<DynamicImage, WaterError> {
    tokio::task::spawn_blocking(move || decode_image(&path, &bytes)).await?
}

pub fn decode_image(path: &Path, bytes: &[u8]) -> Result<DynamicImage, WaterError> {
    image::load_from_memory(bytes).map_err(|source| WaterError::ImageDecode { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("midsummer-water-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([20, 80, 160, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[tokio::test]
    async fn missing_texture_is_a_defined_error() {
        let path = Path::new("no/such/water_textures_2k.png");
        match load_texture_image(path).await {
            Err(WaterError::TextureNotFound { path: reported }) => assert_eq!(reported, path),
            other => panic!("expected TextureNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn corrupt_texture_fails_to_decode() {
        let dir = scratch_dir("corrupt");
        let path = dir.join("water.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let result = load_texture_image(&path).await;
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(result, Err(WaterError::ImageDecode { .. })));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn decoding_does_not_stall_the_runtime() {
        let bytes = png_bytes(512, 512);
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            }
        });
        // the ticker has not been polled yet on a current_thread runtime
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        let image = decode_image_blocking(PathBuf::from("water.png"), bytes).await.unwrap();
        ticker.abort();
        assert_eq!(image.dimensions(), (512, 512));
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn missing_shader_is_reported_by_path() {
        let path = Path::new("no/such/water_vs.wgsl");
        assert!(matches!(read_shader(path).await, Err(WaterError::ShaderNotFound { .. })));
    }

    #[tokio::test]
    async fn loads_all_three_files() {
        let dir = scratch_dir("assets");
        std::fs::write(dir.join("water_vs.wgsl"), "// vs").unwrap();
        std::fs::write(dir.join("water_fs.wgsl"), "// fs").unwrap();
        std::fs::write(dir.join("water_textures_2k.png"), png_bytes(4, 2)).unwrap();
        let config = WaterConfig { res_dir: dir.clone(), ..Default::default() };
        let assets = WaterAssets::load(&config).await;
        std::fs::remove_dir_all(&dir).unwrap();
        let assets = assets.unwrap();
        assert_eq!(assets.vertex_source, "// vs");
        assert_eq!(assets.fragment_source, "// fs");
        assert_eq!(assets.texture.dimensions(), (4, 2));
    }

    #[test]
    fn bundled_resources_are_valid() {
        let config = WaterConfig { res_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("res"), ..Default::default() };
        let bytes = std::fs::read(config.texture_path()).unwrap();
        let texture = decode_image(&config.texture_path(), &bytes).unwrap();
        let (width, height) = texture.dimensions();
        assert!(width > 0 && height > 0);
        assert!(std::fs::read_to_string(config.vertex_shader_path()).unwrap().contains("@vertex"));
        assert!(std::fs::read_to_string(config.fragment_shader_path()).unwrap().contains("@fragment"));
    }
}
