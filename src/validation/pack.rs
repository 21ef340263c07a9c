use crate::error::{StickerError, ValidationCode, ValidationError};
use crate::limits::*;
use crate::models::StickerPack;
use crate::outcome::Outcome;
use regex::Regex;
use std::sync::LazyLock;
use sticker_assets::{probe_dimensions, AssetError, AssetStore};
use url::Url;

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9+._%\-]{1,256}@[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$",
    )
    .ok()
});

/// Checks a pack: identity fields, sticker count, tray icon, links, email.
pub fn validate_pack(pack: &StickerPack, store: &AssetStore) -> Outcome<()> {
    if let Err(e) = check_identity(pack).and_then(|_| check_sticker_count(pack)) {
        return Outcome::failure(e);
    }

    let id = pack.identifier.as_str();
    if pack.tray_image_file.trim().is_empty() {
        return Outcome::failure(ValidationError::new(
            ValidationCode::InvalidThumbnail,
            id,
            "tray image file is not set",
        ));
    }
    let tray = match store.read_asset(id, &pack.tray_image_file) {
        Ok(bytes) => bytes,
        Err(e @ (AssetError::NotFound(_) | AssetError::InvalidName(_))) => {
            return Outcome::failure(
                ValidationError::new(ValidationCode::ThumbnailNotFound, id, e.to_string())
                    .with_file(&pack.tray_image_file),
            )
        }
        Err(e) => return Outcome::failure(StickerError::Storage(e)),
    };
    if let Err(e) = check_tray_image(id, &pack.tray_image_file, &tray) {
        return Outcome::failure(e);
    }

    if let Err(e) = check_links(pack) {
        return Outcome::failure(e);
    }
    Outcome::Success(())
}

/// Every file-independent rule, in the same order `validate_pack` applies them.
pub fn check_pack_metadata(pack: &StickerPack) -> Result<(), ValidationError> {
    check_identity(pack)?;
    check_sticker_count(pack)?;
    if pack.tray_image_file.trim().is_empty() {
        return Err(ValidationError::new(
            ValidationCode::InvalidThumbnail,
            &pack.identifier,
            "tray image file is not set",
        ));
    }
    check_links(pack)
}

pub fn check_identity(pack: &StickerPack) -> Result<(), ValidationError> {
    let id = pack.identifier.as_str();
    check_name_field(id, &pack.identifier, ValidationCode::InvalidIdentifier, "identifier")?;
    check_name_field(id, &pack.name, ValidationCode::InvalidPackName, "name")?;
    check_name_field(id, &pack.publisher, ValidationCode::InvalidPublisher, "publisher")
}

pub fn check_sticker_count(pack: &StickerPack) -> Result<(), ValidationError> {
    let count = pack.stickers.len();
    if !(MIN_STICKERS..=MAX_STICKERS).contains(&count) {
        let limit = if count < MIN_STICKERS { MIN_STICKERS } else { MAX_STICKERS };
        return Err(ValidationError::new(
            ValidationCode::InvalidPackSize,
            &pack.identifier,
            format!(
                "sticker count must be between {} and {}",
                MIN_STICKERS, MAX_STICKERS
            ),
        )
        .with_values(limit as u64, count as u64));
    }
    Ok(())
}

/// Size and dimensions of an encoded tray icon.
pub fn check_tray_image(pack_identifier: &str, file_name: &str, bytes: &[u8]) -> Result<(), ValidationError> {
    let len = bytes.len() as u64;
    if len > TRAY_MAX_BYTES {
        return Err(ValidationError::new(
            ValidationCode::ThumbnailFileSize,
            pack_identifier,
            "tray image is too large",
        )
        .with_file(file_name)
        .with_values(TRAY_MAX_BYTES, len));
    }

    let (width, height) = probe_dimensions(bytes).map_err(|e| {
        ValidationError::new(ValidationCode::InvalidThumbnail, pack_identifier, e.to_string())
            .with_file(file_name)
    })?;

    let edge = TRAY_MIN_EDGE_PX..=TRAY_MAX_EDGE_PX;
    for (label, value) in [("height", height), ("width", width)] {
        if !edge.contains(&value) {
            let limit = if value < TRAY_MIN_EDGE_PX { TRAY_MIN_EDGE_PX } else { TRAY_MAX_EDGE_PX };
            return Err(ValidationError::new(
                ValidationCode::ThumbnailDimensions,
                pack_identifier,
                format!(
                    "tray {} must be between {} and {} px",
                    label, TRAY_MIN_EDGE_PX, TRAY_MAX_EDGE_PX
                ),
            )
            .with_file(file_name)
            .with_values(u64::from(limit), u64::from(value)));
        }
    }
    Ok(())
}

/// Store links, publisher URLs and email.
pub fn check_links(pack: &StickerPack) -> Result<(), ValidationError> {
    let id = pack.identifier.as_str();
    check_url(
        id,
        pack.android_play_store_link.as_deref(),
        ValidationCode::InvalidAndroidUrl,
        Some(PLAY_STORE_DOMAIN),
    )?;
    check_url(
        id,
        pack.ios_app_store_link.as_deref(),
        ValidationCode::InvalidIosUrl,
        Some(APPLE_STORE_DOMAIN),
    )?;
    for link in [
        &pack.license_agreement_website,
        &pack.privacy_policy_website,
        &pack.publisher_website,
    ] {
        check_url(id, link.as_deref(), ValidationCode::InvalidWebsite, None)?;
    }

    if let Some(email) = present(pack.publisher_email.as_deref()) {
        if !EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email)) {
            return Err(ValidationError::new(
                ValidationCode::InvalidEmail,
                id,
                format!("'{}' is not a valid email", email),
            ));
        }
    }
    Ok(())
}

fn check_name_field(
    pack_identifier: &str,
    value: &str,
    code: ValidationCode,
    label: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(code, pack_identifier, format!("{} is empty", label)));
    }
    let len = value.chars().count();
    if len > NAME_MAX_CHARS {
        return Err(ValidationError::new(
            code,
            pack_identifier,
            format!("{} is longer than {} characters", label, NAME_MAX_CHARS),
        )
        .with_values(NAME_MAX_CHARS as u64, len as u64));
    }
    if !value.chars().all(is_allowed_char) {
        return Err(ValidationError::new(
            ValidationCode::InvalidCharacters,
            pack_identifier,
            format!(
                "{} '{}' may only contain a-z, A-Z, 0-9, _, -, ., ' and space",
                label, value
            ),
        ));
    }
    if value.contains("..") {
        return Err(ValidationError::new(
            ValidationCode::DoubleDot,
            pack_identifier,
            format!("{} '{}' must not contain '..'", label, value),
        ));
    }
    Ok(())
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '\'' | ' ')
}

fn check_url(
    pack_identifier: &str,
    value: Option<&str>,
    code: ValidationCode,
    domain: Option<&str>,
) -> Result<(), ValidationError> {
    let Some(raw) = present(value) else {
        return Ok(());
    };
    let fail = |msg: String| -> Result<(), ValidationError> {
        Err(ValidationError::new(code, pack_identifier, msg))
    };

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => return fail(format!("'{}' is not a valid URL: {}", raw, e)),
    };
    if !matches!(url.scheme(), "http" | "https") {
        return fail(format!("'{}' must use http or https", raw));
    }
    if let Some(domain) = domain {
        if url.host_str() != Some(domain) {
            return fail(format!("'{}' must point to {}", raw, domain));
        }
    }
    Ok(())
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
