//! 2D textures: decoding with `image`, upload with wgpu

use std::path::{Path, PathBuf};

use crate::settings::TextureSource;

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to read texture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture {label}: {source}")]
    Decode {
        label: String,
        #[source]
        source: image::ImageError,
    },
}

/// Decoded pixels, always expanded to RGBA8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Channel count of the source image before expansion
    pub channels: u8,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Decode an encoded image (PNG or JPEG). `flip_vertically` puts the
    /// first row of the file at the bottom, so v=0 samples the last row.
    pub fn decode(label: &str, bytes: &[u8], flip_vertically: bool) -> Result<Self, TextureError> {
        let decoded = image::load_from_memory(bytes).map_err(|source| TextureError::Decode {
            label: label.to_string(),
            source,
        })?;
        let channels = decoded.color().channel_count();
        let mut rgba = decoded.to_rgba8();
        if flip_vertically {
            image::imageops::flip_vertical_in_place(&mut rgba);
        }

        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            channels,
            rgba: rgba.into_raw(),
        })
    }

    pub fn load(path: &Path, flip_vertically: bool) -> Result<Self, TextureError> {
        let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::decode(&path.display().to_string(), &bytes, flip_vertically)
    }

    /// One opaque white pixel
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            channels: 4,
            rgba: vec![255; 4],
        }
    }
}

/// A sampled texture with its view and sampler
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &DecodedImage,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // Repeat wrap, linear filtering. One mip level, so minification never picks a LOD.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_image(device, queue, &DecodedImage::white(), "white")
    }

    /// Texture for the uniform `name`; white if nothing is configured or the
    /// image cannot be loaded.
    pub fn load_or_white(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        source: Option<&TextureSource>,
    ) -> Self {
        let Some(source) = source else {
            log::debug!("no image configured for `{name}`, using white");
            return Self::white(device, queue);
        };
        match DecodedImage::load(&source.path, source.flip_vertically) {
            Ok(image) => {
                log::info!(
                    "loaded `{name}` from {} ({}x{}, {} channels)",
                    source.path.display(),
                    image.width,
                    image.height,
                    image.channels
                );
                Self::from_image(device, queue, &image, name)
            }
            Err(e) => {
                log::error!("Failed to load texture: {e}");
                Self::white(device, queue)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(write: impl Fn(&mut Cursor<&mut Vec<u8>>)) -> Vec<u8> {
        let mut bytes = Vec::new();
        write(&mut Cursor::new(&mut bytes));
        bytes
    }

    #[test]
    fn test_decode_rgb_png_expands_to_rgba() {
        let img = RgbImage::from_fn(3, 2, |x, _| Rgb([x as u8 * 100, 0, 0]));
        let bytes = encode_png(|w| img.write_to(w, ImageFormat::Png).unwrap());

        let decoded = DecodedImage::decode("test", &bytes, false).unwrap();
        assert_eq!((decoded.width, decoded.height, decoded.channels), (3, 2, 3));
        assert_eq!(decoded.rgba.len(), 3 * 2 * 4);
        assert_eq!(&decoded.rgba[4..8], &[100, 0, 0, 255]);
    }

    #[test]
    fn test_flip_puts_first_row_last() {
        let img = RgbaImage::from_fn(1, 2, |_, y| {
            if y == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let bytes = encode_png(|w| img.write_to(w, ImageFormat::Png).unwrap());

        let upright = DecodedImage::decode("test", &bytes, false).unwrap();
        let flipped = DecodedImage::decode("test", &bytes, true).unwrap();
        assert_eq!(upright.channels, 4);
        assert_eq!(&upright.rgba[0..4], &[255, 0, 0, 255]);
        assert_eq!(&flipped.rgba[0..4], &[0, 0, 255, 255]);
        assert_eq!(&flipped.rgba[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = DecodedImage::decode("garbage", b"not an image", false).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DecodedImage::load(Path::new("/nonexistent/container.jpg"), false).unwrap_err();
        let TextureError::Io { path, .. } = err else {
            panic!("expected an io error");
        };
        assert_eq!(path, Path::new("/nonexistent/container.jpg"));
    }

    #[test]
    fn test_white_fallback() {
        let white = DecodedImage::white();
        assert_eq!((white.width, white.height), (1, 1));
        assert_eq!(white.rgba, vec![255; 4]);
    }
}
