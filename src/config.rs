use crate::error::StickerError;
use crate::filesystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sticker_assets::{AssetLayout, AssetStore, PlaceholderGenerator};

pub const DEFAULT_PACKAGE_NAME: &str = "com.example.stickers";

/// Runtime settings, loaded from TOML. Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StickerConfig {
    /// Package name of the hosting app
    pub package_name: String,
    /// Content authority; must start with `package_name`
    pub authority: String,
    pub files_dir: PathBuf,
    /// Where converted stickers wait before assembly
    pub cache_dir: PathBuf,
    /// Placeholder templates and the warning image
    pub bundled_assets_dir: PathBuf,
    /// Callers that get unfiltered, validated access
    pub privileged_packages: Vec<String>,
    pub default_publisher: String,
    pub database_file_name: String,
}

impl Default for StickerConfig {
    fn default() -> Self {
        let files_dir = filesystem::get_app_data_dir(DEFAULT_PACKAGE_NAME);
        Self {
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
            authority: format!("{}.stickercontentprovider", DEFAULT_PACKAGE_NAME),
            bundled_assets_dir: files_dir.join("bundled"),
            files_dir,
            cache_dir: filesystem::get_app_cache_dir(DEFAULT_PACKAGE_NAME),
            privileged_packages: vec!["com.whatsapp".to_string(), "com.whatsapp.w4b".to_string()],
            default_publisher: "Sticker App".to_string(),
            database_file_name: "stickers.db".to_string(),
        }
    }
}

impl StickerConfig {
    /// Config rooted at one directory, used by tests and the desktop tool.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            files_dir: root.join("files"),
            cache_dir: root.join("cache"),
            bundled_assets_dir: root.join("bundled"),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, StickerError> {
        toml::from_str(text).map_err(|e| StickerError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, StickerError> {
        toml::to_string_pretty(self).map_err(|e| StickerError::Config(e.to_string()))
    }

    /// Reads a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, StickerError> {
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| StickerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn database_path(&self) -> PathBuf {
        self.files_dir.join(&self.database_file_name)
    }

    pub fn is_privileged(&self, caller: Option<&str>) -> bool {
        caller.is_some_and(|c| self.privileged_packages.iter().any(|p| p == c))
    }

    pub fn asset_layout(&self) -> AssetLayout {
        AssetLayout::new(&self.files_dir, &self.cache_dir)
    }

    pub fn asset_store(&self) -> AssetStore {
        AssetStore::new(self.asset_layout())
    }

    pub fn placeholder_generator(&self) -> PlaceholderGenerator {
        PlaceholderGenerator::new(&self.bundled_assets_dir, &self.cache_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StickerConfig::from_toml_str(
            r#"
            package_name = "org.demo"
            authority = "org.demo.provider"
            files_dir = "/tmp/demo"
            "#,
        )
        .unwrap();

        assert_eq!(config.package_name, "org.demo");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/demo/stickers.db"));
        assert_eq!(config.privileged_packages.len(), 2);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = StickerConfig::rooted_at(Path::new("/srv/stickers"));
        let text = config.to_toml_string().unwrap();
        assert_eq!(StickerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = StickerConfig::from_toml_str("package_name = [").unwrap_err();
        assert!(matches!(err, StickerError::Config(_)));
    }

    #[test]
    fn test_privileged_callers() {
        let config = StickerConfig::default();
        assert!(config.is_privileged(Some("com.whatsapp")));
        assert!(config.is_privileged(Some("com.whatsapp.w4b")));
        assert!(!config.is_privileged(Some("com.other")));
        assert!(!config.is_privileged(None));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = StickerConfig::load(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.package_name, DEFAULT_PACKAGE_NAME);
    }
}
