//! Media conversion and enumeration.
//!
//! Stickers are produced from picked media by a [`MediaEncoder`] and land in the staging
//! area; a [`MediaSource`] lists what is available there. Video and animated input need a
//! native codec and are rejected by the bundled encoder.

use crate::error::StickerError;
use crate::limits::STICKER_EDGE_PX;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use sticker_assets::inspect_webp;

/// Turns a picked image or video into a sticker file.
pub trait MediaEncoder: Send + Sync {
    /// Encodes `source` and returns the path of the written WebP file.
    fn encode(&self, source: &Path, quality: u8, lossless: bool) -> Result<PathBuf, StickerError>;
}

/// A media file offered for sticker creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: &'static str,
    pub size: u64,
}

pub trait MediaSource: Send + Sync {
    /// Media whose type matches `mime_filter` (`image/webp`, `image/*`, `*/*`).
    fn list_media(&self, mime_filter: &str) -> Result<Vec<MediaItem>, StickerError>;
}

/// Encoder backed by the `image` crate.
///
/// Still images are scaled to fit 512x512, centered on a transparent canvas and written
/// as lossless WebP. The crate has no lossy WebP encoder, so `quality` is not applied.
#[derive(Debug, Clone)]
pub struct ImageCrateEncoder {
    output_dir: PathBuf,
}

impl ImageCrateEncoder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl MediaEncoder for ImageCrateEncoder {
    fn encode(&self, source: &Path, quality: u8, lossless: bool) -> Result<PathBuf, StickerError> {
        let mime = guess_mime_from_ext(source);
        if is_motion(mime) {
            return Err(StickerError::Encoding(format!(
                "{} ({}) needs a native video codec",
                source.display(),
                mime
            )));
        }
        if mime == "image/webp" {
            let bytes = fs::read(source).map_err(|e| {
                StickerError::Encoding(format!("Could not read {}: {}", source.display(), e))
            })?;
            if inspect_webp(&bytes).map(|info| info.animated).unwrap_or(false) {
                return Err(StickerError::Encoding(format!(
                    "{} is animated and needs a native codec",
                    source.display()
                )));
            }
        }
        if !lossless {
            log::debug!("Lossy quality {} requested, writing lossless WebP", quality);
        }

        let img = image::open(source).map_err(|e| {
            StickerError::Encoding(format!("Could not decode {}: {}", source.display(), e))
        })?;

        let (width, height) = calculate_resize_dimensions(
            img.width(),
            img.height(),
            STICKER_EDGE_PX,
            STICKER_EDGE_PX,
        );
        let resized = img.resize_exact(width, height, FilterType::Lanczos3).to_rgba8();
        let mut canvas = RgbaImage::new(STICKER_EDGE_PX, STICKER_EDGE_PX);
        let x = (STICKER_EDGE_PX - width) / 2;
        let y = (STICKER_EDGE_PX - height) / 2;
        imageops::overlay(&mut canvas, &resized, i64::from(x), i64::from(y));

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("sticker");
        fs::create_dir_all(&self.output_dir).map_err(StickerError::from_io(&self.output_dir))?;
        let target = self.output_dir.join(format!("{}.webp", stem));
        let file = fs::File::create(&target).map_err(StickerError::from_io(&target))?;
        canvas
            .write_with_encoder(WebPEncoder::new_lossless(BufWriter::new(file)))
            .map_err(|e| StickerError::Encoding(e.to_string()))?;

        log::debug!(
            "Encoded {} -> {} ({}x{} on {}px canvas)",
            source.display(),
            target.display(),
            width,
            height,
            STICKER_EDGE_PX
        );
        Ok(target)
    }
}

/// Lists the files of one directory, usually the staging area.
#[derive(Debug, Clone)]
pub struct DirectoryMediaSource {
    dir: PathBuf,
}

impl DirectoryMediaSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MediaSource for DirectoryMediaSource {
    fn list_media(&self, mime_filter: &str) -> Result<Vec<MediaItem>, StickerError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StickerError::from_io(&self.dir)(e)),
        };

        let mut items = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StickerError::from_io(&self.dir))?;
            let path = entry.path();
            let metadata = entry.metadata().map_err(StickerError::from_io(&path))?;
            if !metadata.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };
            // Partial copies from the staging area
            if file_name.ends_with(".part") {
                continue;
            }
            let mime_type = guess_mime_from_ext(&path);
            if mime_matches(mime_filter, mime_type) {
                items.push(MediaItem {
                    path,
                    file_name,
                    mime_type,
                    size: metadata.len(),
                });
            }
        }
        items.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(items)
    }
}

/// MIME type from the file extension.
pub fn guess_mime_from_ext(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("3gp") => "video/3gpp",
        _ => "application/octet-stream",
    }
}

fn is_motion(mime: &str) -> bool {
    mime == "image/gif" || mime.starts_with("video/")
}

fn mime_matches(filter: &str, mime: &str) -> bool {
    match filter.split_once('/') {
        Some(("*", "*")) => true,
        Some((kind, "*")) => mime.split('/').next() == Some(kind),
        _ => filter == mime,
    }
}

/// Largest size with the original aspect ratio that fits `max_width` x `max_height`.
/// Smaller images are scaled up.
fn calculate_resize_dimensions(
    original_width: u32,
    original_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if original_width == 0 || original_height == 0 {
        return (max_width, max_height);
    }
    let ratio =
        (original_width as f64 / max_width as f64).max(original_height as f64 / max_height as f64);
    let width = ((original_width as f64 / ratio).round() as u32).clamp(1, max_width);
    let height = ((original_height as f64 / ratio).round() as u32).clamp(1, max_height);
    (width, height)
}
