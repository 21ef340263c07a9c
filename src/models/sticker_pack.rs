use crate::models::Sticker;
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use sticker_assets::THUMBNAIL_FILE;

/// A named collection of stickers plus the publisher metadata the host app shows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StickerPack {
    pub identifier: String,
    pub name: String,
    pub publisher: String,
    pub tray_image_file: String,
    pub publisher_email: Option<String>,
    pub publisher_website: Option<String>,
    pub privacy_policy_website: Option<String>,
    pub license_agreement_website: Option<String>,
    pub android_play_store_link: Option<String>,
    pub ios_app_store_link: Option<String>,
    pub image_data_version: String,
    pub avoid_cache: bool,
    pub animated_sticker_pack: bool,
    pub stickers: Vec<Sticker>,
    #[serde(default)]
    pub is_whitelisted: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl StickerPack {
    /// Creates an empty static pack that uses the standard tray file name
    pub fn new(identifier: &str, name: &str, publisher: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            name: name.to_string(),
            publisher: publisher.to_string(),
            tray_image_file: THUMBNAIL_FILE.to_string(),
            publisher_email: None,
            publisher_website: None,
            privacy_policy_website: None,
            license_agreement_website: None,
            android_play_store_link: None,
            ios_app_store_link: None,
            image_data_version: "1".to_string(),
            avoid_cache: false,
            animated_sticker_pack: false,
            stickers: Vec::new(),
            is_whitelisted: false,
            created_at: None,
        }
    }

    pub fn sticker_file_names(&self) -> Vec<String> {
        self.stickers
            .iter()
            .map(|s| s.image_file_name.clone())
            .collect()
    }

    pub fn sticker(&self, file_name: &str) -> Option<&Sticker> {
        self.stickers.iter().find(|s| s.image_file_name == file_name)
    }

    pub fn total_size(&self) -> u64 {
        self.stickers.iter().map(|s| s.size).sum()
    }

    pub fn has_invalid_stickers(&self) -> bool {
        self.stickers.iter().any(|s| !s.is_valid())
    }

    pub fn invalid_stickers(&self) -> Vec<&Sticker> {
        self.stickers.iter().filter(|s| !s.is_valid()).collect()
    }

    /// Copy of the pack with invalid stickers removed.
    pub fn filtered(&self) -> StickerPack {
        let mut pack = self.clone();
        pack.stickers.retain(Sticker::is_valid);
        pack
    }
}

impl<'r> TryFrom<&Row<'r>> for StickerPack {
    type Error = rusqlite::Error;

    /// Maps the pack columns of a row. Stickers are attached by the caller.
    fn try_from(row: &Row<'r>) -> Result<Self, Self::Error> {
        let image_data_version: Option<String> = row.get("image_data_version")?;

        Ok(StickerPack {
            identifier: row.get("sticker_pack_identifier")?,
            name: row.get("sticker_pack_name")?,
            publisher: row.get("sticker_pack_publisher")?,
            tray_image_file: row.get("sticker_pack_icon")?,
            publisher_email: non_empty(row.get("sticker_pack_publisher_email")?),
            publisher_website: non_empty(row.get("sticker_pack_publisher_website")?),
            privacy_policy_website: non_empty(row.get("sticker_pack_privacy_policy_website")?),
            license_agreement_website: non_empty(
                row.get("sticker_pack_license_agreement_website")?,
            ),
            android_play_store_link: non_empty(row.get("android_play_store_link")?),
            ios_app_store_link: non_empty(row.get("ios_app_download_link")?),
            image_data_version: image_data_version.unwrap_or_else(|| "1".to_string()),
            avoid_cache: row.get("whatsapp_will_not_cache_stickers")?,
            animated_sticker_pack: row.get("animated_sticker_pack")?,
            stickers: Vec::new(),
            is_whitelisted: false,
            created_at: row.get("created_at")?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
