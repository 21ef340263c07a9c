use crate::error::{StickerError, ValidationCode, ValidationError};
use crate::limits::*;
use crate::models::Sticker;
use crate::outcome::Outcome;
use sticker_assets::{inspect_webp, AssetError, AssetStore, WebpInfo};

/// Checks one sticker file of a pack.
pub fn validate_sticker(
    store: &AssetStore,
    pack_identifier: &str,
    sticker: &Sticker,
    animated_pack: bool,
) -> Outcome<()> {
    let file = sticker.image_file_name.as_str();
    if file.trim().is_empty() {
        return Outcome::failure(ValidationError::new(
            ValidationCode::InvalidStickerPath,
            pack_identifier,
            "sticker file name is empty",
        ));
    }

    if let Err(e) = check_accessibility(pack_identifier, sticker, animated_pack) {
        return Outcome::failure(e);
    }

    let bytes = match store.read_asset(pack_identifier, file) {
        Ok(bytes) => bytes,
        Err(AssetError::NotFound(path)) => {
            return Outcome::failure(
                ValidationError::new(
                    ValidationCode::StickerFileNotExist,
                    pack_identifier,
                    format!("{} does not exist", path.display()),
                )
                .with_file(file),
            )
        }
        Err(AssetError::InvalidName(name)) => {
            return Outcome::failure(
                ValidationError::new(
                    ValidationCode::InvalidStickerPath,
                    pack_identifier,
                    format!("'{}' is not a valid file name", name),
                )
                .with_file(file),
            )
        }
        Err(e) => return Outcome::failure(StickerError::Storage(e)),
    };

    match check_sticker_bytes(pack_identifier, file, animated_pack, &bytes) {
        Ok(()) => Outcome::Success(()),
        Err(e) => Outcome::failure(e),
    }
}

/// Parses a sticker file and checks it against the pack type.
pub fn check_sticker_bytes(
    pack_identifier: &str,
    file_name: &str,
    animated_pack: bool,
    bytes: &[u8],
) -> Result<(), ValidationError> {
    let info = inspect_webp(bytes).map_err(|e| {
        ValidationError::new(ValidationCode::FileType, pack_identifier, e.to_string())
            .with_file(file_name)
    })?;
    check_sticker_info(pack_identifier, file_name, animated_pack, bytes.len() as u64, &info)
}

/// File size, dimensions, type and timing of a parsed sticker.
///
/// The size ceiling follows the file's own type so that a still image in an animated
/// pack (or the reverse) is always reported as a type mismatch, not a size error.
pub fn check_sticker_info(
    pack_identifier: &str,
    file_name: &str,
    animated_pack: bool,
    byte_len: u64,
    info: &WebpInfo,
) -> Result<(), ValidationError> {
    let error = |code: ValidationCode, message: String| {
        ValidationError::new(code, pack_identifier, message).with_file(file_name)
    };

    let is_animated = info.frame_count() > 1;
    let max_bytes = if is_animated {
        ANIMATED_STICKER_MAX_BYTES
    } else {
        STATIC_STICKER_MAX_BYTES
    };
    if byte_len > max_bytes {
        return Err(error(
            ValidationCode::FileSize,
            format!("sticker must be at most {} KB", max_bytes / 1024),
        )
        .with_values(max_bytes, byte_len));
    }

    for (label, value) in [("height", info.height), ("width", info.width)] {
        if value != STICKER_EDGE_PX {
            return Err(error(
                ValidationCode::StickerDimensions,
                format!("sticker {} must be {} px", label, STICKER_EDGE_PX),
            )
            .with_values(u64::from(STICKER_EDGE_PX), u64::from(value)));
        }
    }

    if animated_pack != is_animated {
        let message = if animated_pack {
            "animated pack contains a static sticker"
        } else {
            "static pack contains an animated sticker"
        };
        return Err(error(ValidationCode::StickerType, message.to_string()));
    }

    if is_animated {
        if let Some(short) = info
            .frame_durations
            .iter()
            .copied()
            .find(|d| *d < FRAME_MIN_DURATION_MS)
        {
            return Err(error(
                ValidationCode::StickerDuration,
                format!("frames must last at least {} ms", FRAME_MIN_DURATION_MS),
            )
            .with_values(u64::from(FRAME_MIN_DURATION_MS), u64::from(short)));
        }
        let total = info.total_duration_ms();
        if total > ANIMATION_MAX_DURATION_MS {
            return Err(error(
                ValidationCode::StickerDuration,
                format!("animation must not exceed {} ms", ANIMATION_MAX_DURATION_MS),
            )
            .with_values(ANIMATION_MAX_DURATION_MS, total));
        }
    }

    Ok(())
}

pub fn check_accessibility(
    pack_identifier: &str,
    sticker: &Sticker,
    animated_pack: bool,
) -> Result<(), ValidationError> {
    let Some(text) = sticker.accessibility_text.as_deref() else {
        return Ok(());
    };
    let max = if animated_pack {
        ANIMATED_ACCESSIBILITY_MAX_CHARS
    } else {
        STATIC_ACCESSIBILITY_MAX_CHARS
    };
    let len = text.chars().count();
    if len > max {
        return Err(ValidationError::new(
            ValidationCode::InvalidAccessibility,
            pack_identifier,
            format!("accessibility text must be at most {} characters", max),
        )
        .with_file(&sticker.image_file_name)
        .with_values(max as u64, len as u64));
    }
    Ok(())
}
