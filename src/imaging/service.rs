use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{
    foundation::error::{LimboError, LimboResult},
    imaging::channels::ExrChannels,
    imaging::layers::{Channel, CryptomatteImage, LayeredImage, RankPlane},
    imaging::quantize::ByteImage,
};

/// Pixel I/O consumed by the derivation pipeline.
///
/// Implementations address images by path. The pipeline never touches pixel files
/// except through this trait.
pub trait ImageService: Send + Sync {
    /// Load an image and expose its channel groups.
    fn load(&self, path: &Path) -> LimboResult<LayeredImage>;

    /// Load an encoded cryptomatte pass.
    fn load_cryptomatte(&self, path: &Path) -> LimboResult<CryptomatteImage>;

    /// Write an 8-bit image.
    fn save(&self, path: &Path, image: &ByteImage) -> LimboResult<()>;
}

/// Filesystem-backed [`ImageService`].
///
/// OpenEXR files are read channel by channel with the `exr` crate, which exposes
/// depth (`Z`) and multi-layer cryptomatte passes. Other formats go through the
/// `image` crate; a cryptomatte stored that way must hold 32-bit float RGBA with
/// R/G carrying rank 0 id and coverage and B/A rank 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageService;

impl FsImageService {
    pub fn new() -> Self {
        Self
    }

    fn is_exr(path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("exr"))
    }

    fn decode(path: &Path) -> LimboResult<image::DynamicImage> {
        let bytes = std::fs::read(path).map_err(|e| LimboError::io_at(path, e))?;
        image::load_from_memory(&bytes).map_err(|e| match e {
            image::ImageError::IoError(err) => LimboError::io_at(path, err),
            other => LimboError::decode(format!("image '{}': {other}", path.display())),
        })
    }
}

impl ImageService for FsImageService {
    fn load(&self, path: &Path) -> LimboResult<LayeredImage> {
        if Self::is_exr(path) {
            return ExrChannels::read(path)?.layered();
        }
        let img = Self::decode(path)?;
        let color = img.color();
        let out = LayeredImage::new(img.width(), img.height());

        let mut out = if color.has_color() {
            out.with_layer(Channel::Color, img.to_rgb32f().into_raw())?
        } else {
            out.with_layer(Channel::Luminance, img.to_luma32f().into_raw())?
        };
        if color.has_alpha() {
            let alpha = img.to_rgba32f().pixels().map(|p| p.0[3]).collect();
            out = out.with_layer(Channel::Matte, alpha)?;
        }
        Ok(out)
    }

    fn load_cryptomatte(&self, path: &Path) -> LimboResult<CryptomatteImage> {
        if Self::is_exr(path) {
            return ExrChannels::read(path)?.cryptomatte();
        }
        let img = Self::decode(path)?;
        let rank_count = match &img {
            image::DynamicImage::ImageRgba32F(_) => 2,
            image::DynamicImage::ImageRgb32F(_) => 1,
            _ => {
                return Err(LimboError::decode(format!(
                    "cryptomatte '{}' must hold 32-bit float channels, found {:?}",
                    path.display(),
                    img.color()
                )));
            }
        };

        let rgba = img.to_rgba32f();
        let (width, height) = rgba.dimensions();
        let n = width as usize * height as usize;
        let mut ranks = (0..rank_count)
            .map(|_| RankPlane {
                ids: Vec::with_capacity(n),
                coverage: Vec::with_capacity(n),
            })
            .collect::<Vec<_>>();
        for px in rgba.pixels() {
            for (r, rank) in ranks.iter_mut().enumerate() {
                rank.ids.push(px.0[2 * r]);
                rank.coverage.push(px.0[2 * r + 1]);
            }
        }
        CryptomatteImage::new(width, height, ranks)
    }

    fn save(&self, path: &Path, image: &ByteImage) -> LimboResult<()> {
        let color = match image.channels {
            1 => image::ColorType::L8,
            3 => image::ColorType::Rgb8,
            n => {
                return Err(LimboError::validation(format!(
                    "cannot save {n}-channel byte image"
                )));
            }
        };
        image::save_buffer_with_format(
            path,
            &image.data,
            image.width,
            image.height,
            color,
            image::ImageFormat::Png,
        )
        .map_err(|e| match e {
            image::ImageError::IoError(err) => LimboError::io_at(path, err),
            other => anyhow::Error::new(other)
                .context(format!("write png '{}'", path.display()))
                .into(),
        })
    }
}

#[derive(Default)]
struct MemoryState {
    images: HashMap<PathBuf, LayeredImage>,
    cryptomattes: HashMap<PathBuf, CryptomatteImage>,
    saved: HashMap<PathBuf, ByteImage>,
    loads: HashMap<PathBuf, u64>,
}

/// In-memory [`ImageService`] for callers that already hold pixels (and for tests).
///
/// Saved images become visible to [`saved`](Self::saved) and are also loadable.
#[derive(Default)]
pub struct MemoryImageService {
    state: Mutex<MemoryState>,
}

impl std::fmt::Debug for MemoryImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageService").finish_non_exhaustive()
    }
}

impl MemoryImageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&self, path: impl Into<PathBuf>, image: LayeredImage) {
        self.lock().images.insert(path.into(), image);
    }

    pub fn insert_cryptomatte(&self, path: impl Into<PathBuf>, image: CryptomatteImage) {
        self.lock().cryptomattes.insert(path.into(), image);
    }

    pub fn remove(&self, path: &Path) {
        let mut state = self.lock();
        state.images.remove(path);
        state.cryptomattes.remove(path);
        state.saved.remove(path);
    }

    pub fn saved(&self, path: &Path) -> Option<ByteImage> {
        self.lock().saved.get(path).cloned()
    }

    /// Number of successful loads of `path` (either kind).
    pub fn load_count(&self, path: &Path) -> u64 {
        self.lock().loads.get(path).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn missing(path: &Path) -> LimboError {
        LimboError::io(format!("'{}': no such image", path.display()))
    }
}

impl ImageService for MemoryImageService {
    fn load(&self, path: &Path) -> LimboResult<LayeredImage> {
        let mut state = self.lock();
        let image = match (state.images.get(path), state.saved.get(path)) {
            (Some(img), _) => img.clone(),
            (None, Some(saved)) => byte_image_to_layered(saved)?,
            (None, None) => return Err(Self::missing(path)),
        };
        *state.loads.entry(path.to_path_buf()).or_default() += 1;
        Ok(image)
    }

    fn load_cryptomatte(&self, path: &Path) -> LimboResult<CryptomatteImage> {
        let mut state = self.lock();
        let image = state
            .cryptomattes
            .get(path)
            .cloned()
            .ok_or_else(|| Self::missing(path))?;
        *state.loads.entry(path.to_path_buf()).or_default() += 1;
        Ok(image)
    }

    fn save(&self, path: &Path, image: &ByteImage) -> LimboResult<()> {
        self.lock().saved.insert(path.to_path_buf(), image.clone());
        Ok(())
    }
}

fn byte_image_to_layered(image: &ByteImage) -> LimboResult<LayeredImage> {
    let channel = match image.channels {
        1 => Channel::Luminance,
        _ => Channel::Color,
    };
    let data = image.data.iter().map(|&b| f32::from(b) / 255.0).collect();
    LayeredImage::new(image.width, image.height).with_layer(channel, data)
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/service.rs"]
mod tests;
