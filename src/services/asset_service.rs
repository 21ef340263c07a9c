//! Asset Store operations reported as [`Outcome`]s.
//!
//! Wraps `sticker_assets` and decides which storage results are warnings
//! (nothing to delete), debug notes (directory already there) or failures.

use crate::error::{StickerError, ValidationCode, ValidationError};
use crate::models::StickerPack;
use crate::outcome::Outcome;
use std::path::PathBuf;
use sticker_assets::{
    create_tray_thumbnail, AssetError, AssetStore, DirectoryState, PlaceholderGenerator,
    PlaceholderKind, Removal, TrayThumbnail,
};

/// Maps a storage error to the application error type.
pub fn convert_error(e: AssetError) -> StickerError {
    match e {
        AssetError::ImageDecode(msg) | AssetError::ImageEncode(msg) | AssetError::MalformedWebp(msg) => {
            StickerError::Encoding(msg)
        }
        other => StickerError::Storage(other),
    }
}

pub fn create_main_directory(store: &AssetStore) -> Outcome<PathBuf> {
    let root = store.layout().root();
    match store.create_main_directory() {
        Ok(DirectoryState::Created) => Outcome::Success(root),
        Ok(DirectoryState::AlreadyExisted) => {
            Outcome::debug(format!("Main directory already exists: {}", root.display()))
        }
        Err(e) => Outcome::failure(convert_error(e)),
    }
}

/// Creates the directory of one pack. A second call yields a debug outcome, never a failure.
pub fn create_pack_directory(store: &AssetStore, pack_identifier: &str) -> Outcome<PathBuf> {
    match store.create_pack_directory(pack_identifier) {
        Ok((dir, DirectoryState::Created)) => Outcome::Success(dir),
        Ok((dir, DirectoryState::AlreadyExisted)) => {
            Outcome::debug(format!("Pack directory already exists: {}", dir.display()))
        }
        Err(e) => Outcome::failure(convert_error(e)),
    }
}

/// Copies every sticker of `pack` from the staging area into its pack directory.
pub fn copy_staged_files(store: &AssetStore, pack: &StickerPack) -> Outcome<()> {
    let dest = match store.layout().pack_dir(&pack.identifier) {
        Ok(dir) => dir,
        Err(e) => return Outcome::failure(convert_error(e)),
    };
    let names = pack.stickers.iter().map(|s| s.image_file_name.as_str());
    match store.copy_staged_files(names, &dest) {
        Ok(report) => {
            log::debug!(
                "Pack {}: {} copied, {} already present",
                pack.identifier,
                report.copied.len(),
                report.skipped.len()
            );
            Outcome::Success(())
        }
        Err(e) => Outcome::failure(convert_error(e)),
    }
}

/// Builds the tray icon of a pack from one of its staged stickers.
pub fn create_thumbnail(store: &AssetStore, pack_identifier: &str, source_file: &str) -> Outcome<TrayThumbnail> {
    let paths = store
        .layout()
        .staged_path(source_file)
        .and_then(|src| Ok((src, store.layout().pack_dir(pack_identifier)?)));
    let (source, dest) = match paths {
        Ok(paths) => paths,
        Err(e) => return Outcome::failure(convert_error(e)),
    };

    match create_tray_thumbnail(&source, &dest) {
        Ok(tray) => Outcome::Success(tray),
        Err(AssetError::NotFound(path)) => Outcome::failure(
            ValidationError::new(
                ValidationCode::ThumbnailNotFound,
                pack_identifier,
                format!("thumbnail source not found: {}", path.display()),
            )
            .with_file(source_file),
        ),
        Err(AssetError::ImageDecode(msg)) => {
            Outcome::warning(format!("Could not decode thumbnail source {}: {}", source_file, msg))
        }
        Err(e) => Outcome::failure(convert_error(e)),
    }
}

/// Stages placeholders until `pack` can reach `minimum` stickers.
///
/// Returns the added file names. While another task generates placeholders for the same
/// pack the result is a warning and the caller should retry.
pub fn stage_placeholders(
    generator: &PlaceholderGenerator,
    pack: &StickerPack,
    minimum: usize,
) -> Outcome<Vec<String>> {
    let kind = PlaceholderKind::for_pack(pack.animated_sticker_pack);
    match generator.fill_to_minimum(&pack.identifier, kind, &pack.sticker_file_names(), minimum) {
        Ok(Some(added)) => Outcome::Success(added),
        Ok(None) => Outcome::warning(format!(
            "Placeholder creation already in progress for pack {}, retry later",
            pack.identifier
        )),
        Err(e) => Outcome::failure(convert_error(e)),
    }
}

pub fn delete_asset(store: &AssetStore, pack_identifier: &str, file_name: &str) -> Outcome<()> {
    match store.delete_asset(pack_identifier, file_name) {
        Ok(Removal::Removed) => Outcome::Success(()),
        Ok(Removal::Missing) => Outcome::warning(format!(
            "Asset {} of pack {} did not exist",
            file_name, pack_identifier
        )),
        Err(e) => Outcome::failure(convert_error(e)),
    }
}

pub fn delete_asset_subset<S: AsRef<str>>(
    store: &AssetStore,
    pack_identifier: &str,
    file_names: &[S],
) -> Outcome<usize> {
    match store.delete_asset_subset(pack_identifier, file_names) {
        Ok(0) => Outcome::warning(format!("No assets deleted for pack {}", pack_identifier)),
        Ok(n) => Outcome::Success(n),
        Err(e) => Outcome::failure(convert_error(e)),
    }
}

/// Empties a pack directory, keeping the directory itself.
pub fn delete_all_assets(store: &AssetStore, pack_identifier: &str) -> Outcome<()> {
    match store.delete_all_assets(pack_identifier) {
        Ok(Removal::Removed) => Outcome::Success(()),
        Ok(Removal::Missing) => Outcome::warning(format!(
            "Pack directory {} does not exist",
            pack_identifier
        )),
        Err(e) => Outcome::failure(convert_error(e)),
    }
}

/// Removes a pack directory and everything in it.
pub fn delete_pack_directory(store: &AssetStore, pack_identifier: &str) -> Outcome<()> {
    match store.delete_pack_directory(pack_identifier) {
        Ok(Removal::Removed) => Outcome::Success(()),
        Ok(Removal::Missing) => Outcome::warning(format!(
            "Pack directory {} does not exist",
            pack_identifier
        )),
        Err(e) => Outcome::failure(convert_error(e)),
    }
}
