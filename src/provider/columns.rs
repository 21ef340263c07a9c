//! Column vocabulary of the cursors returned to content consumers.
//!
//! Consumers read these by name; renaming any of them breaks them.

use crate::models::{CursorValue, MatrixCursor, Sticker, StickerPack};

pub const STICKER_PACK_IDENTIFIER: &str = "sticker_pack_identifier";
pub const STICKER_PACK_NAME: &str = "sticker_pack_name";
pub const STICKER_PACK_PUBLISHER: &str = "sticker_pack_publisher";
pub const STICKER_PACK_ICON: &str = "sticker_pack_icon";
pub const ANDROID_PLAY_STORE_LINK: &str = "android_play_store_link";
pub const IOS_APP_DOWNLOAD_LINK: &str = "ios_app_download_link";
pub const PUBLISHER_EMAIL: &str = "sticker_pack_publisher_email";
pub const PUBLISHER_WEBSITE: &str = "sticker_pack_publisher_website";
pub const PRIVACY_POLICY_WEBSITE: &str = "sticker_pack_privacy_policy_website";
pub const LICENSE_AGREEMENT_WEBSITE: &str = "sticker_pack_license_agreement_website";
pub const IMAGE_DATA_VERSION: &str = "image_data_version";
pub const AVOID_CACHE: &str = "whatsapp_will_not_cache_stickers";
pub const ANIMATED_STICKER_PACK: &str = "animated_sticker_pack";

pub const STICKER_FILE_NAME: &str = "sticker_file_name";
pub const STICKER_EMOJI: &str = "sticker_emoji";
pub const STICKER_IS_VALID: &str = "sticker_is_valid";
pub const STICKER_ACCESSIBILITY_TEXT: &str = "sticker_accessibility_text";

pub const PACK_COLUMNS: [&str; 13] = [
    STICKER_PACK_IDENTIFIER,
    STICKER_PACK_NAME,
    STICKER_PACK_PUBLISHER,
    STICKER_PACK_ICON,
    ANDROID_PLAY_STORE_LINK,
    IOS_APP_DOWNLOAD_LINK,
    PUBLISHER_EMAIL,
    PUBLISHER_WEBSITE,
    PRIVACY_POLICY_WEBSITE,
    LICENSE_AGREEMENT_WEBSITE,
    IMAGE_DATA_VERSION,
    AVOID_CACHE,
    ANIMATED_STICKER_PACK,
];

pub const STICKER_COLUMNS: [&str; 4] = [
    STICKER_FILE_NAME,
    STICKER_EMOJI,
    STICKER_IS_VALID,
    STICKER_ACCESSIBILITY_TEXT,
];

/// One row per pack. Optional links are sent as empty strings.
pub fn pack_cursor(packs: &[StickerPack]) -> MatrixCursor {
    let mut cursor = MatrixCursor::new(&PACK_COLUMNS);
    for pack in packs {
        let text = |value: &Option<String>| CursorValue::from(value.clone().unwrap_or_default());
        cursor.add_row(vec![
            pack.identifier.as_str().into(),
            pack.name.as_str().into(),
            pack.publisher.as_str().into(),
            pack.tray_image_file.as_str().into(),
            text(&pack.android_play_store_link),
            text(&pack.ios_app_store_link),
            text(&pack.publisher_email),
            text(&pack.publisher_website),
            text(&pack.privacy_policy_website),
            text(&pack.license_agreement_website),
            pack.image_data_version.as_str().into(),
            pack.avoid_cache.into(),
            pack.animated_sticker_pack.into(),
        ]);
    }
    cursor
}

/// One row per sticker.
pub fn sticker_cursor(stickers: &[Sticker]) -> MatrixCursor {
    let mut cursor = MatrixCursor::new(&STICKER_COLUMNS);
    for sticker in stickers {
        cursor.add_row(vec![
            sticker.image_file_name.as_str().into(),
            sticker.emoji_column().into(),
            sticker.invalid_code.clone().into(),
            sticker.accessibility_text.clone().into(),
        ]);
    }
    cursor
}
