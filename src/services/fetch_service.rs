//! Loads every stored pack and sorts it by what the host app will accept.

use crate::config::StickerConfig;
use crate::database::StickerDatabase;
use crate::error::{StickerError, ValidationCode, ValidationError};
use crate::limits::MIN_STICKERS;
use crate::models::{Sticker, StickerPack};
use crate::outcome::{tri, Outcome};
use crate::services::assembly_service::{PackReservation, PLACEHOLDER_ACCESSIBILITY_TEXT, PLACEHOLDER_EMOJI};
use crate::services::{asset_service, pack_repository};
use crate::validation;
use std::collections::HashSet;
use std::sync::Arc;
use sticker_assets::AssetStore;

/// Asks the host app whether a pack has already been added there.
pub trait WhitelistCheck: Send + Sync {
    fn is_whitelisted(&self, pack_identifier: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct PackListing {
    pub valid: Vec<StickerPack>,
    /// Usable packs where some stickers carry a validity marker
    pub valid_with_invalid_stickers: Vec<StickerPack>,
    /// Rejected packs; each error carries its pack
    pub invalid: Vec<StickerError>,
}

impl PackListing {
    pub fn len(&self) -> usize {
        self.valid.len() + self.valid_with_invalid_stickers.len() + self.invalid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loads all packs, tops up short ones with placeholders, re-validates every pack and
/// sticker and refreshes the stored validity markers.
pub fn load_and_validate_packs(
    config: &StickerConfig,
    db: &StickerDatabase,
    whitelist: Option<&dyn WhitelistCheck>,
) -> Outcome<PackListing> {
    let store = config.asset_store();
    let packs = tri!(pack_repository::select_all(&db.lock()));

    let mut seen = HashSet::new();
    for pack in &packs {
        if !seen.insert(pack.identifier.as_str()) {
            return Outcome::failure(ValidationError::new(
                ValidationCode::DuplicateIdentifier,
                &pack.identifier,
                "sticker pack identifiers must be unique",
            ));
        }
    }

    let mut listing = PackListing::default();
    for mut pack in packs {
        if pack.stickers.len() < MIN_STICKERS {
            if let Err(e) = top_up(config, &store, db, &mut pack) {
                log::warn!("Could not add placeholders to pack {}: {}", pack.identifier, e);
            }
        }

        match validation::validate_pack(&pack, &store) {
            Outcome::Failure(e) => {
                log::warn!("Pack {} is invalid: {}", pack.identifier, e);
                listing.invalid.push(e.with_pack(pack));
                continue;
            }
            Outcome::Success(()) => {}
            other => log::debug!("Pack {} validation: {:?}", pack.identifier, other.message()),
        }

        if let Err(e) = refresh_sticker_markers(&store, db, &mut pack) {
            listing.invalid.push(e.with_pack(pack));
            continue;
        }

        if let Some(check) = whitelist {
            pack.is_whitelisted = check.is_whitelisted(&pack.identifier);
        }

        if pack.has_invalid_stickers() {
            listing.valid_with_invalid_stickers.push(pack);
        } else {
            listing.valid.push(pack);
        }
    }

    log::info!(
        "Loaded {} pack(s): {} valid, {} with invalid stickers, {} invalid",
        listing.len(),
        listing.valid.len(),
        listing.valid_with_invalid_stickers.len(),
        listing.invalid.len()
    );
    Outcome::Success(listing)
}

/// [`load_and_validate_packs`] on the blocking thread pool.
pub async fn load_and_validate_packs_async(
    config: StickerConfig,
    db: Arc<StickerDatabase>,
    whitelist: Option<Arc<dyn WhitelistCheck>>,
) -> Outcome<PackListing> {
    let task = tokio::task::spawn_blocking(move || {
        load_and_validate_packs(&config, &db, whitelist.as_deref())
    });
    match task.await {
        Ok(outcome) => outcome,
        Err(e) => Outcome::failure(e),
    }
}

/// Removes pack directories that have no metadata row, e.g. after an interrupted
/// assembly. Returns the removed identifiers.
pub fn reap_orphaned_directories(store: &AssetStore, db: &StickerDatabase) -> Outcome<Vec<String>> {
    let known: HashSet<String> = match pack_repository::pack_identifiers(&db.lock()) {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => return Outcome::failure(e),
    };
    let dirs = match store.list_pack_directories() {
        Ok(dirs) => dirs,
        Err(e) => return Outcome::failure(asset_service::convert_error(e)),
    };

    let mut reaped = Vec::new();
    for dir in dirs.into_iter().filter(|d| !known.contains(d)) {
        // Skip packs that are being assembled right now
        let Some(_reservation) = PackReservation::acquire(&dir) else {
            log::debug!("Pack {} is being assembled, not reaping it", dir);
            continue;
        };
        match pack_repository::pack_exists(&db.lock(), &dir) {
            Ok(false) => {}
            Ok(true) => continue,
            Err(e) => return Outcome::failure(e),
        }
        match asset_service::delete_pack_directory(store, &dir) {
            Outcome::Success(()) => {
                log::info!("Removed orphaned pack directory {}", dir);
                reaped.push(dir);
            }
            Outcome::Failure(e) => return Outcome::Failure(e),
            _ => {}
        }
    }
    Outcome::Success(reaped)
}

fn top_up(
    config: &StickerConfig,
    store: &AssetStore,
    db: &StickerDatabase,
    pack: &mut StickerPack,
) -> Result<(), StickerError> {
    let generator = config.placeholder_generator();
    let added = match asset_service::stage_placeholders(&generator, pack, MIN_STICKERS) {
        Outcome::Success(added) => added,
        Outcome::Failure(e) => return Err(e),
        // Another task is generating; validation will report the short pack
        _ => return Ok(()),
    };
    if added.is_empty() {
        return Ok(());
    }

    let dest = store.layout().pack_dir(&pack.identifier)?;
    store.copy_staged_files(added.iter().map(String::as_str), &dest)?;

    let conn = db.lock();
    for name in added {
        let mut sticker = Sticker::new(&pack.identifier, &name, vec![PLACEHOLDER_EMOJI.to_string()])
            .with_accessibility_text(PLACEHOLDER_ACCESSIBILITY_TEXT);
        sticker.size = store.asset_len(&pack.identifier, &name)?;
        if let Outcome::Failure(e) = pack_repository::insert_sticker(&conn, &sticker, &pack.identifier) {
            return Err(e);
        }
        pack.stickers.push(sticker);
    }
    match pack_repository::bump_image_data_version(&conn, &pack.identifier) {
        Outcome::Success(version) => pack.image_data_version = version,
        Outcome::Failure(e) => return Err(e),
        _ => {}
    }
    Ok(())
}

/// Validates every sticker and writes changed validity markers back.
fn refresh_sticker_markers(
    store: &AssetStore,
    db: &StickerDatabase,
    pack: &mut StickerPack,
) -> Result<(), StickerError> {
    let identifier = pack.identifier.clone();
    let animated = pack.animated_sticker_pack;
    for sticker in pack.stickers.iter_mut() {
        let was_valid = sticker.is_valid();
        let previous = sticker.invalid_reason();
        match validation::validate_sticker(store, &identifier, sticker, animated) {
            Outcome::Success(()) if !was_valid => {
                log::info!("Sticker {} of pack {} is valid again", sticker.image_file_name, identifier);
                sticker.invalid_code = None;
                persist(pack_repository::clear_sticker_invalid(
                    &db.lock(),
                    &identifier,
                    &sticker.image_file_name,
                ))?;
            }
            Outcome::Failure(StickerError::Validation(e)) if previous != Some(e.code) => {
                sticker.mark_invalid(e.code);
                persist(pack_repository::mark_sticker_invalid(
                    &db.lock(),
                    &identifier,
                    &sticker.image_file_name,
                    e.code,
                ))?;
            }
            Outcome::Failure(StickerError::Validation(_)) | Outcome::Success(()) => {}
            Outcome::Failure(e) => return Err(e),
            other => log::debug!("Sticker {}: {:?}", sticker.image_file_name, other.message()),
        }
    }
    Ok(())
}

fn persist(outcome: Outcome<usize>) -> Result<(), StickerError> {
    match outcome {
        Outcome::Failure(e) => Err(e),
        _ => Ok(()),
    }
}
