//! Pack deletion and sticker repair.

use crate::database::StickerDatabase;
use crate::outcome::{tri, Outcome};
use crate::services::{asset_service, pack_repository};
use sticker_assets::AssetStore;

/// Deletes a pack: its asset directory first, then its rows.
///
/// Safe to call again after an interruption. Only when neither the directory nor the row
/// existed is the result a warning.
pub fn delete_pack(store: &AssetStore, db: &StickerDatabase, pack_identifier: &str) -> Outcome<()> {
    let had_directory = match asset_service::delete_pack_directory(store, pack_identifier) {
        Outcome::Success(()) => true,
        Outcome::Failure(e) => return Outcome::Failure(e),
        _ => false,
    };
    let had_row = match pack_repository::delete_pack(&db.lock(), pack_identifier) {
        Outcome::Success(_) => true,
        Outcome::Failure(e) => return Outcome::Failure(e),
        _ => false,
    };

    if had_directory || had_row {
        log::info!("Deleted sticker pack {}", pack_identifier);
        Outcome::Success(())
    } else {
        Outcome::warning(format!("Sticker pack {} does not exist", pack_identifier))
    }
}

/// Removes the stickers of a pack that carry a validity marker, files and rows.
/// Returns the removed file names and bumps the pack's image data version.
pub fn remove_invalid_stickers(
    store: &AssetStore,
    db: &StickerDatabase,
    pack_identifier: &str,
) -> Outcome<Vec<String>> {
    let stickers = tri!(pack_repository::select_stickers(&db.lock(), pack_identifier));
    let invalid: Vec<String> = stickers
        .into_iter()
        .filter(|s| !s.is_valid())
        .map(|s| s.image_file_name)
        .collect();
    if invalid.is_empty() {
        return Outcome::warning(format!("Pack {} has no invalid stickers", pack_identifier));
    }

    // Files may already be gone; the rows are what matter
    if let Outcome::Failure(e) = asset_service::delete_asset_subset(store, pack_identifier, &invalid) {
        return Outcome::Failure(e);
    }
    {
        let conn = db.lock();
        tri!(pack_repository::delete_stickers(&conn, pack_identifier, &invalid));
        tri!(pack_repository::bump_image_data_version(&conn, pack_identifier));
    }

    log::info!(
        "Removed {} invalid sticker(s) from pack {}",
        invalid.len(),
        pack_identifier
    );
    Outcome::Success(invalid)
}
