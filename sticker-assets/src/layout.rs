use crate::error::AssetError;
use std::path::{Path, PathBuf};

/// Directory below the files dir that holds one sub-directory per pack.
pub const STICKERS_ASSET: &str = "stickers_asset";

/// Reserved file name of the tray icon inside a pack directory.
pub const THUMBNAIL_FILE: &str = "thumbnail.jpg";

/// Bundled image served instead of a broken sticker to non-privileged callers.
pub const WARNING_IMAGE: &str = "sticker_warning.webp";

/// Resolves pack and file names to paths.
///
/// Names are single path components. Anything that could escape the pack
/// directory (separators, `.` or `..`) is rejected before a path is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    files_dir: PathBuf,
    staging_dir: PathBuf,
}

impl AssetLayout {
    pub fn new(files_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
            staging_dir: staging_dir.into(),
        }
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// `<files_dir>/stickers_asset`
    pub fn root(&self) -> PathBuf {
        self.files_dir.join(STICKERS_ASSET)
    }

    pub fn pack_dir(&self, pack_identifier: &str) -> Result<PathBuf, AssetError> {
        check_component(pack_identifier)?;
        Ok(self.root().join(pack_identifier))
    }

    pub fn asset_path(&self, pack_identifier: &str, file_name: &str) -> Result<PathBuf, AssetError> {
        check_component(file_name)?;
        Ok(self.pack_dir(pack_identifier)?.join(file_name))
    }

    pub fn staged_path(&self, file_name: &str) -> Result<PathBuf, AssetError> {
        check_component(file_name)?;
        Ok(self.staging_dir.join(file_name))
    }
}

pub(crate) fn check_component(name: &str) -> Result<(), AssetError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(AssetError::InvalidName(name.to_string()));
    }
    Ok(())
}
