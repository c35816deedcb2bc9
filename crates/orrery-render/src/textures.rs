//! Day, night and ring textures named in the body catalog, resolved under a
//! texture root. A texture that cannot be read is replaced by one texel of
//! the body color.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

/// Texel format of every body texture.
pub const BODY_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("cannot decode {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// `data` is not `width·height` RGBA8 texels.
    #[error("{width}x{height} RGBA8 needs {expected} bytes, got {actual}")]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("empty {width}x{height} texture")]
    ZeroDimensions { width: u32, height: u32 },
}

pub struct BodyTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub dimensions: (u32, u32),
}

/// Texture cache keyed by catalog identifier; solid fallbacks are keyed by
/// their `#rrggbb` color.
pub struct TextureLibrary {
    root: PathBuf,
    cache: FxHashMap<String, Arc<BodyTexture>>,
    sampler: wgpu::Sampler,
}

impl TextureLibrary {
    pub fn new(device: &wgpu::Device, root: impl Into<PathBuf>) -> Self {
        // Longitude wraps, latitude stops at the poles.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("body-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            root: root.into(),
            cache: FxHashMap::default(),
            sampler,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn cached(&self, key: &str) -> Option<Arc<BodyTexture>> {
        self.cache.get(key).cloned()
    }

    fn insert(&mut self, key: String, texture: BodyTexture) -> Arc<BodyTexture> {
        let texture = Arc::new(texture);
        self.cache.insert(key, Arc::clone(&texture));
        texture
    }

    /// Decode `name` relative to the texture root and upload it once.
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
    ) -> Result<Arc<BodyTexture>, TextureError> {
        if let Some(hit) = self.cached(name) {
            return Ok(hit);
        }
        let path = self.root.join(name);
        let rgba = image::open(&path)
            .map_err(|source| TextureError::Load { path, source })?
            .into_rgba8();
        let (width, height) = rgba.dimensions();
        let texture = upload_rgba8(device, queue, name, rgba.as_raw(), width, height)?;
        log::debug!("Texture '{name}' loaded, {width}x{height}");
        Ok(self.insert(name.to_owned(), texture))
    }

    /// A single texel of `color`.
    pub fn solid(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: [f32; 3],
    ) -> Arc<BodyTexture> {
        let texel = color_to_rgba8(color);
        let key = format!("#{:02x}{:02x}{:02x}", texel[0], texel[1], texel[2]);
        if let Some(hit) = self.cached(&key) {
            return hit;
        }
        let texture = write_texture(device, queue, &key, &texel, 1, 1);
        self.insert(key, texture)
    }

    /// `name` when it loads, otherwise a solid `color` texel.
    pub fn load_or_solid(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: Option<&str>,
        color: [f32; 3],
    ) -> Arc<BodyTexture> {
        let Some(name) = name else {
            return self.solid(device, queue, color);
        };
        self.load(device, queue, name).unwrap_or_else(|e| {
            log::warn!("{e}; using a solid color instead");
            self.solid(device, queue, color)
        })
    }
}

/// Quantize a `[0, 1]` color to an opaque RGBA8 texel.
pub fn color_to_rgba8(color: [f32; 3]) -> [u8; 4] {
    let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(color[0]), q(color[1]), q(color[2]), 255]
}

/// Checks the texel buffer before handing it to [`write_texture`].
fn upload_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    data: &[u8],
    width: u32,
    height: u32,
) -> Result<BodyTexture, TextureError> {
    validate(data, width, height)?;
    Ok(write_texture(device, queue, label, data, width, height))
}

fn write_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    data: &[u8],
    width: u32,
    height: u32,
) -> BodyTexture {
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: BODY_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        data,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    BodyTexture {
        texture,
        view,
        dimensions: (width, height),
    }
}

fn validate(data: &[u8], width: u32, height: u32) -> Result<(), TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroDimensions { width, height });
    }
    let expected = width as usize * height as usize * 4;
    if data.len() == expected {
        return Ok(());
    }
    Err(TextureError::DataSizeMismatch {
        actual: data.len(),
        expected,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;

    #[test]
    fn test_color_quantization() {
        assert_eq!(color_to_rgba8([0.0, 0.5, 1.0]), [0, 128, 255, 255]);
        assert_eq!(color_to_rgba8([-1.0, 2.0, 0.2]), [0, 255, 51, 255]);
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        assert!(matches!(
            validate(&[], 0, 4),
            Err(TextureError::ZeroDimensions { width: 0, height: 4 })
        ));
        assert!(matches!(
            validate(&[0; 12], 2, 2),
            Err(TextureError::DataSizeMismatch {
                actual: 12,
                expected: 16,
                ..
            })
        ));
        assert!(validate(&[0; 16], 2, 2).is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_solid_color() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let mut library = TextureLibrary::new(&device, dir.path());
        let texture = library.load_or_solid(&device, &queue, Some("absent.png"), [1.0, 0.0, 0.0]);
        assert_eq!(texture.dimensions, (1, 1));
        assert!(matches!(
            library.load(&device, &queue, "absent.png"),
            Err(TextureError::Load { .. })
        ));
    }

    #[test]
    fn test_png_on_disk_is_loaded_and_cached() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
            .save(dir.path().join("moon.png"))
            .unwrap();
        let mut library = TextureLibrary::new(&device, dir.path());
        let a = library.load_or_solid(&device, &queue, Some("moon.png"), [0.5; 3]);
        let b = library.load_or_solid(&device, &queue, Some("moon.png"), [0.5; 3]);
        assert_eq!(a.dimensions, (4, 2));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_solid_textures_are_shared_per_color() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let mut library = TextureLibrary::new(&device, ".");
        let a = library.solid(&device, &queue, [0.5; 3]);
        let b = library.solid(&device, &queue, [0.5; 3]);
        let c = library.solid(&device, &queue, [0.1; 3]);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
