//! Cover image upload, processing and storage
//!
//! Uploads are checked for size and type, decoded, scaled down to fit
//! inside 400x600 (never up), and re-encoded as JPEG. Stored files live
//! under `<covers root>/books/` and are referenced by their path relative
//! to the covers root, e.g. `books/<uuid>.jpg`.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use marque_common::{Error, Result};
use tracing::{debug, warn};
use uuid::Uuid;

/// Request field carrying the cover file
pub const COVER_FIELD: &str = "cover_image";

pub const MAX_WIDTH: u32 = 400;
pub const MAX_HEIGHT: u32 = 600;
pub const JPEG_QUALITY: u8 = 85;

/// Accepted upload types, as listed in validation messages
pub const ALLOWED_TYPES: [&str; 4] = ["jpeg", "png", "jpg", "gif"];

/// Sub-directory of the covers root holding book covers
const BOOK_COVER_DIR: &str = "books";

/// Raw uploaded file
#[derive(Debug, Clone)]
pub struct CoverUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Cover ready to be written: JPEG bytes plus final dimensions
#[derive(Debug, Clone)]
pub struct ProcessedCover {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// File storage for processed covers
///
/// Calls are blocking; async callers go through [`store_cover`] and
/// [`delete_cover`].
pub trait CoverStore: Send + Sync {
    /// Directory served under `/storage`
    fn root(&self) -> &Path;

    /// Persist a cover and return its path relative to [`CoverStore::root`]
    fn store(&self, cover: &ProcessedCover) -> Result<String>;

    /// Remove a stored cover; a missing file is not an error
    fn delete(&self, relative_path: &str) -> Result<()>;
}

/// Covers stored as files below a root directory
#[derive(Debug, Clone)]
pub struct FsCoverStore {
    root: PathBuf,
}

impl FsCoverStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path for a stored reference, refusing anything that
    /// escapes the root
    fn resolve(&self, relative_path: &str) -> Result<PathBuf> {
        let relative = Path::new(relative_path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        if !safe || relative_path.is_empty() {
            return Err(Error::Internal(format!(
                "Refusing cover path outside storage root: {}",
                relative_path
            )));
        }

        Ok(self.root.join(relative))
    }
}

impl CoverStore for FsCoverStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn store(&self, cover: &ProcessedCover) -> Result<String> {
        let dir = self.root.join(BOOK_COVER_DIR);
        std::fs::create_dir_all(&dir)?;

        let relative = format!("{}/{}.jpg", BOOK_COVER_DIR, Uuid::new_v4());
        std::fs::write(self.root.join(&relative), &cover.jpeg)?;

        debug!(
            "Stored cover {} ({}x{}, {} bytes)",
            relative,
            cover.width,
            cover.height,
            cover.jpeg.len()
        );
        Ok(relative)
    }

    fn delete(&self, relative_path: &str) -> Result<()> {
        let path = self.resolve(relative_path)?;

        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted cover {}", relative_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Size and type problems with an upload, as `cover_image` messages
pub fn upload_errors(upload: &CoverUpload, max_kb: u64) -> Vec<String> {
    let mut messages = Vec::new();

    let size_kb = (upload.bytes.len() as u64).div_ceil(1024);
    if size_kb > max_kb {
        messages.push(format!(
            "The cover image field must not be greater than {} kilobytes.",
            max_kb
        ));
    }

    match image::guess_format(&upload.bytes) {
        Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif) => {}
        Ok(_) => messages.push(format!(
            "The cover image field must be a file of type: {}.",
            ALLOWED_TYPES.join(", ")
        )),
        Err(_) => messages.push("The cover image field must be an image.".to_string()),
    }

    messages
}

/// Target size fitting inside the cover bounds with aspect ratio kept
///
/// Images already inside the bounds keep their size.
pub fn fit_within(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_WIDTH && height <= MAX_HEIGHT {
        return (width, height);
    }

    let scale = f64::min(
        MAX_WIDTH as f64 / width as f64,
        MAX_HEIGHT as f64 / height as f64,
    );
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Decode, scale down and encode as JPEG
///
/// Uploads reach this point only after [`upload_errors`] accepted their
/// header, so a decode failure here is an internal error.
pub fn process_cover(bytes: &[u8]) -> Result<ProcessedCover> {
    let decoded = image::load_from_memory(bytes).map_err(|e| {
        debug!("Cover decode failed after header check: {}", e);
        Error::Internal(format!("Failed to decode cover: {}", e))
    })?;

    let (width, height) = fit_within(decoded.width(), decoded.height());
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Lanczos3)
    };

    let rgb = resized.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut jpeg), JPEG_QUALITY)
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| Error::Internal(format!("Failed to encode cover: {}", e)))?;

    Ok(ProcessedCover {
        jpeg,
        width,
        height,
    })
}

/// [`process_cover`] on the blocking thread pool
pub async fn prepare_cover(upload: CoverUpload) -> Result<ProcessedCover> {
    tokio::task::spawn_blocking(move || process_cover(&upload.bytes))
        .await
        .map_err(|e| Error::Internal(format!("Cover processing task failed: {}", e)))?
}

/// [`CoverStore::store`] on the blocking thread pool
pub async fn store_cover(store: Arc<dyn CoverStore>, cover: ProcessedCover) -> Result<String> {
    tokio::task::spawn_blocking(move || store.store(&cover))
        .await
        .map_err(|e| Error::Internal(format!("Cover store task failed: {}", e)))?
}

/// Best-effort removal of a stored cover; failures are logged
pub async fn delete_cover(store: Arc<dyn CoverStore>, relative_path: String) {
    let path = relative_path.clone();
    let outcome = tokio::task::spawn_blocking(move || store.delete(&path)).await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to delete cover {}: {}", relative_path, e),
        Err(e) => warn!("Cover delete task failed for {}: {}", relative_path, e),
    }
}
