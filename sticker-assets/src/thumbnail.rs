use crate::error::AssetError;
use crate::layout::THUMBNAIL_FILE;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Edge length of generated tray icons.
pub const TRAY_EDGE: u32 = 96;

/// Size a generated tray icon is compressed down to.
pub const TRAY_BYTE_BUDGET: usize = 40 * 1024;

const START_QUALITY: u8 = 100;
const QUALITY_STEP: u8 = 5;
const MIN_QUALITY: u8 = 5;

/// A tray icon written to a pack directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayThumbnail {
    pub path: PathBuf,
    pub byte_len: usize,
    pub quality: u8,
}

/// Creates `thumbnail.jpg` in `dest_dir` from `source`.
///
/// The image is cropped to a square tray icon and re-encoded at falling JPEG quality
/// until it fits [`TRAY_BYTE_BUDGET`] or the quality floor is reached.
pub fn create_tray_thumbnail(source: &Path, dest_dir: &Path) -> Result<TrayThumbnail, AssetError> {
    if !source.is_file() {
        return Err(AssetError::NotFound(source.to_path_buf()));
    }

    let img = image::open(source)
        .map_err(|e| AssetError::ImageDecode(format!("{}: {}", source.display(), e)))?;
    let tray = DynamicImage::ImageRgb8(
        img.resize_to_fill(TRAY_EDGE, TRAY_EDGE, FilterType::Lanczos3)
            .to_rgb8(),
    );

    let mut quality = START_QUALITY;
    let mut bytes = encode_jpeg(&tray, quality)?;
    while bytes.len() > TRAY_BYTE_BUDGET && quality > MIN_QUALITY {
        quality -= QUALITY_STEP;
        bytes = encode_jpeg(&tray, quality)?;
    }
    if bytes.len() > TRAY_BYTE_BUDGET {
        log::warn!(
            "Tray icon still {} bytes at minimum quality {}",
            bytes.len(),
            quality
        );
    }

    let path = dest_dir.join(THUMBNAIL_FILE);
    std::fs::write(&path, &bytes).map_err(AssetError::io(&path))?;
    log::debug!("Tray icon written: {:?} ({} bytes, quality {})", path, bytes.len(), quality);

    Ok(TrayThumbnail {
        path,
        byte_len: bytes.len(),
        quality,
    })
}

/// Reads width and height from an encoded image without decoding the pixels.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), AssetError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AssetError::ImageDecode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| AssetError::ImageDecode(e.to_string()))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, AssetError> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| AssetError::ImageEncode(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_webp(path: &Path, width: u32, height: u32) {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8, 255])
        });
        img.save_with_format(path, ImageFormat::WebP).unwrap();
    }

    #[test]
    fn test_creates_tray_within_budget() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("first.webp");
        write_webp(&source, 512, 512);

        let tray = create_tray_thumbnail(&source, tmp.path()).unwrap();

        assert_eq!(tray.path, tmp.path().join(THUMBNAIL_FILE));
        assert!(tray.byte_len <= TRAY_BYTE_BUDGET);
        let bytes = std::fs::read(&tray.path).unwrap();
        assert_eq!(probe_dimensions(&bytes).unwrap(), (TRAY_EDGE, TRAY_EDGE));
    }

    #[test]
    fn test_missing_source() {
        let tmp = TempDir::new().unwrap();
        let err = create_tray_thumbnail(&tmp.path().join("nope.webp"), tmp.path()).unwrap_err();
        assert!(err.is_not_found());
        assert!(!tmp.path().join(THUMBNAIL_FILE).exists());
    }

    #[test]
    fn test_undecodable_source() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("broken.webp");
        std::fs::write(&source, b"definitely not an image").unwrap();

        let err = create_tray_thumbnail(&source, tmp.path()).unwrap_err();
        assert!(matches!(err, AssetError::ImageDecode(_)));
    }

    #[test]
    fn test_probe_dimensions() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("wide.webp");
        write_webp(&source, 300, 200);
        let bytes = std::fs::read(&source).unwrap();
        assert_eq!(probe_dimensions(&bytes).unwrap(), (300, 200));
        assert!(probe_dimensions(b"junk").is_err());
    }
}
