use crate::error::ValidationCode;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// One image inside a pack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sticker {
    pub image_file_name: String,
    pub emojis: Vec<String>,
    pub accessibility_text: Option<String>,
    /// `None` while the sticker is valid, otherwise the tag of the rule it broke
    pub invalid_code: Option<String>,
    pub size: u64,
    pub pack_identifier: String,
}

impl Sticker {
    pub fn new(pack_identifier: &str, image_file_name: &str, emojis: Vec<String>) -> Self {
        Self {
            image_file_name: image_file_name.to_string(),
            emojis,
            accessibility_text: None,
            invalid_code: None,
            size: 0,
            pack_identifier: pack_identifier.to_string(),
        }
    }

    pub fn with_accessibility_text(mut self, text: &str) -> Self {
        self.accessibility_text = Some(text.to_string());
        self
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_code.as_deref().map_or(true, str::is_empty)
    }

    pub fn mark_invalid(&mut self, code: ValidationCode) {
        self.invalid_code = Some(code.as_str().to_string());
    }

    /// The rule this sticker broke, when the stored tag is a known one.
    pub fn invalid_reason(&self) -> Option<ValidationCode> {
        self.invalid_code.as_deref().and_then(ValidationCode::from_str)
    }

    /// Emojis as stored in the database and returned in cursors.
    pub fn emoji_column(&self) -> String {
        self.emojis.join(",")
    }

    pub fn parse_emojis(column: &str) -> Vec<String> {
        column
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl<'r> TryFrom<&Row<'r>> for Sticker {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'r>) -> Result<Self, Self::Error> {
        let emojis: Option<String> = row.get("sticker_emoji")?;
        let invalid_code: Option<String> = row.get("sticker_is_valid")?;
        let size: Option<i64> = row.get("sticker_size")?;

        Ok(Sticker {
            image_file_name: row.get("sticker_file_name")?,
            emojis: Sticker::parse_emojis(emojis.as_deref().unwrap_or_default()),
            accessibility_text: row.get("sticker_accessibility_text")?,
            invalid_code: invalid_code.filter(|c| !c.is_empty()),
            size: size.unwrap_or(0).max(0) as u64,
            pack_identifier: row.get("fk_sticker_pack")?,
        })
    }
}
