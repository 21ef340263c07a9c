//! Turns staged sticker files into a committed pack.
//!
//! Stages run strictly in order and the first non-success outcome is returned as is:
//! stage metadata, create the main and pack directories, copy the staged files, build the
//! tray icon, validate the pack, validate each sticker, insert the metadata. Only
//! per-sticker validation failures are absorbed: the sticker gets marked invalid and the
//! pack is still created. A pack directory left behind without a metadata row is emptied
//! and reused.

use crate::config::StickerConfig;
use crate::database::StickerDatabase;
use crate::error::{StickerError, ValidationCode, ValidationError};
use crate::limits::{MAX_STICKERS, MIN_STICKERS};
use crate::models::{Sticker, StickerPack};
use crate::outcome::{tri, Outcome};
use crate::services::{asset_service, pack_repository};
use crate::validation;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use sticker_assets::AssetStore;
use uuid::Uuid;

pub const PLACEHOLDER_EMOJI: &str = "🗿";
pub const PLACEHOLDER_ACCESSIBILITY_TEXT: &str = "Placeholder sticker";

/// A converted sticker waiting in the staging area.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedSticker {
    pub file_name: String,
    pub emojis: Vec<String>,
    pub accessibility_text: Option<String>,
}

impl StagedSticker {
    pub fn new(file_name: &str, emojis: &[&str]) -> Self {
        Self {
            file_name: file_name.to_string(),
            emojis: emojis.iter().map(|e| e.to_string()).collect(),
            accessibility_text: None,
        }
    }
}

/// What the user picked for a new pack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyRequest {
    /// Generated when absent
    pub identifier: Option<String>,
    pub name: String,
    /// Falls back to the configured default publisher
    pub publisher: Option<String>,
    pub animated: bool,
    pub stickers: Vec<StagedSticker>,
    /// Staged image for the tray icon; the first sticker when absent
    pub tray_source: Option<String>,
    pub publisher_email: Option<String>,
    pub publisher_website: Option<String>,
    pub privacy_policy_website: Option<String>,
    pub license_agreement_website: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPack {
    pub pack: StickerPack,
    /// One entry per sticker that was stored with a validity marker
    pub invalid_stickers: Vec<ValidationError>,
    /// Set when the pack needs repair before the host app accepts it
    pub warning: Option<String>,
}

fn reserved() -> &'static Mutex<HashSet<String>> {
    static RESERVED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    RESERVED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive claim on a pack identifier while its directory and rows are being
/// written. Released on drop.
#[derive(Debug)]
pub(crate) struct PackReservation {
    pack_identifier: String,
}

impl PackReservation {
    pub(crate) fn acquire(pack_identifier: &str) -> Option<Self> {
        let mut set = reserved().lock().unwrap_or_else(|p| p.into_inner());
        if !set.insert(pack_identifier.to_string()) {
            return None;
        }
        Some(Self {
            pack_identifier: pack_identifier.to_string(),
        })
    }
}

impl Drop for PackReservation {
    fn drop(&mut self) {
        let mut set = reserved().lock().unwrap_or_else(|p| p.into_inner());
        set.remove(&self.pack_identifier);
    }
}

/// Runs the whole assembly for one pack.
///
/// The identifier is reserved for the whole run, so a second assembly of the same
/// identifier fails with `DUPLICATE_IDENTIFIER` instead of writing into the same
/// directory. The pack directory is removed again when a later stage fails.
pub fn assemble_pack(
    config: &StickerConfig,
    db: &StickerDatabase,
    mut request: AssemblyRequest,
) -> Outcome<AssembledPack> {
    let store = config.asset_store();
    let identifier = non_empty(request.identifier.take()).unwrap_or_else(|| Uuid::new_v4().to_string());
    let Some(_reservation) = PackReservation::acquire(&identifier) else {
        return Outcome::failure(ValidationError::new(
            ValidationCode::DuplicateIdentifier,
            &identifier,
            "a pack with this identifier is already being assembled",
        ));
    };

    let tray_source = non_empty(request.tray_source.take());
    let mut pack = tri!(stage_metadata(config, db, identifier, request));
    log::info!(
        "Assembling pack {} ({} sticker(s), animated: {})",
        pack.identifier,
        pack.stickers.len(),
        pack.animated_sticker_pack
    );

    let mut owns_dir = false;
    let outcome = commit_pack(&store, db, &mut pack, tray_source.as_deref(), &mut owns_dir);
    if !outcome.is_success() && owns_dir {
        log::warn!("Assembly of pack {} stopped, removing its directory", pack.identifier);
        if let Err(e) = store.delete_pack_directory(&pack.identifier) {
            log::error!("Could not remove directory of pack {}: {}", pack.identifier, e);
        }
    }
    outcome
}

/// [`assemble_pack`] on the blocking thread pool.
pub async fn assemble_pack_async(
    config: StickerConfig,
    db: Arc<StickerDatabase>,
    request: AssemblyRequest,
) -> Outcome<AssembledPack> {
    match tokio::task::spawn_blocking(move || assemble_pack(&config, &db, request)).await {
        Ok(outcome) => outcome,
        Err(e) => Outcome::failure(e),
    }
}

/// Builds the in-memory pack and tops it up with placeholders.
fn stage_metadata(
    config: &StickerConfig,
    db: &StickerDatabase,
    identifier: String,
    request: AssemblyRequest,
) -> Outcome<StickerPack> {
    let publisher = request
        .publisher
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| config.default_publisher.clone());

    let mut pack = StickerPack::new(&identifier, &request.name, &publisher);
    pack.animated_sticker_pack = request.animated;
    pack.publisher_email = non_empty(request.publisher_email);
    pack.publisher_website = non_empty(request.publisher_website);
    pack.privacy_policy_website = non_empty(request.privacy_policy_website);
    pack.license_agreement_website = non_empty(request.license_agreement_website);

    let mut seen = HashSet::new();
    for staged in request.stickers {
        if !seen.insert(staged.file_name.clone()) {
            log::debug!("Dropping duplicate staged file {}", staged.file_name);
            continue;
        }
        let mut sticker = Sticker::new(&identifier, &staged.file_name, staged.emojis);
        sticker.accessibility_text = non_empty(staged.accessibility_text);
        pack.stickers.push(sticker);
    }

    if let Err(e) = validation::check_identity(&pack) {
        return Outcome::failure(e);
    }
    if pack.stickers.is_empty() || pack.stickers.len() > MAX_STICKERS {
        return Outcome::failure(validation::check_sticker_count(&pack).err().unwrap_or_else(|| {
            ValidationError::new(ValidationCode::InvalidPackSize, &identifier, "no stickers staged")
        }));
    }

    match pack_repository::pack_exists(&db.lock(), &identifier) {
        Ok(false) => {}
        Ok(true) => {
            return Outcome::failure(ValidationError::new(
                ValidationCode::DuplicateIdentifier,
                &identifier,
                "a pack with this identifier already exists",
            ))
        }
        Err(e) => return Outcome::failure(e),
    }

    if pack.stickers.len() < MIN_STICKERS {
        let generator = config.placeholder_generator();
        let added = tri!(asset_service::stage_placeholders(&generator, &pack, MIN_STICKERS));
        for name in added {
            pack.stickers.push(
                Sticker::new(&identifier, &name, vec![PLACEHOLDER_EMOJI.to_string()])
                    .with_accessibility_text(PLACEHOLDER_ACCESSIBILITY_TEXT),
            );
        }
    }
    Outcome::Success(pack)
}

fn commit_pack(
    store: &AssetStore,
    db: &StickerDatabase,
    pack: &mut StickerPack,
    tray_source: Option<&str>,
    owns_dir: &mut bool,
) -> Outcome<AssembledPack> {
    match asset_service::create_main_directory(store) {
        Outcome::Success(_) | Outcome::Debug(_) => {}
        Outcome::Warning(msg) => return Outcome::Warning(msg),
        Outcome::Failure(e) => return Outcome::Failure(e),
    }
    match asset_service::create_pack_directory(store, &pack.identifier) {
        Outcome::Success(_) => *owns_dir = true,
        // No row exists for this identifier, so the directory is a leftover
        Outcome::Debug(_) => {
            log::warn!("Clearing leftover directory of pack {}", pack.identifier);
            match asset_service::delete_all_assets(store, &pack.identifier) {
                Outcome::Success(()) | Outcome::Warning(_) => *owns_dir = true,
                Outcome::Debug(msg) => return Outcome::Debug(msg),
                Outcome::Failure(e) => return Outcome::Failure(e),
            }
        }
        Outcome::Warning(msg) => return Outcome::Warning(msg),
        Outcome::Failure(e) => return Outcome::Failure(e),
    }

    tri!(asset_service::copy_staged_files(store, pack));

    let source = tray_source
        .map(str::to_string)
        .or_else(|| pack.stickers.first().map(|s| s.image_file_name.clone()));
    let Some(source) = source else {
        return Outcome::failure(ValidationError::new(
            ValidationCode::InvalidPackSize,
            &pack.identifier,
            "no stickers staged",
        ));
    };
    let tray = tri!(asset_service::create_thumbnail(store, &pack.identifier, &source));
    log::debug!("Tray icon {} at quality {}", tray.path.display(), tray.quality);

    tri!(validation::validate_pack(pack, store));

    let mut invalid_stickers = Vec::new();
    let identifier = pack.identifier.clone();
    let animated = pack.animated_sticker_pack;
    for sticker in pack.stickers.iter_mut() {
        match store.asset_len(&identifier, &sticker.image_file_name) {
            Ok(len) => sticker.size = len,
            Err(e) => return Outcome::failure(asset_service::convert_error(e)),
        }
        match validation::validate_sticker(store, &identifier, sticker, animated) {
            Outcome::Success(()) => {}
            Outcome::Failure(StickerError::Validation(e)) => {
                log::warn!("Sticker {} of pack {} is invalid: {}", sticker.image_file_name, identifier, e);
                sticker.mark_invalid(e.code);
                invalid_stickers.push(e);
            }
            Outcome::Failure(e) => return Outcome::Failure(e),
            Outcome::Warning(msg) => return Outcome::Warning(msg),
            Outcome::Debug(msg) => return Outcome::Debug(msg),
        }
    }

    let stored = tri!(pack_repository::insert_pack(&db.lock(), pack));
    let warning = if invalid_stickers.is_empty() {
        None
    } else {
        Some(format!(
            "{} of {} sticker(s) in pack {} are invalid",
            invalid_stickers.len(),
            stored.stickers.len(),
            stored.identifier
        ))
    };
    if let Some(message) = &warning {
        log::warn!("{}", message);
    }
    Outcome::Success(AssembledPack {
        pack: stored,
        invalid_stickers,
        warning,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::fs;
    use std::path::Path;
    use sticker_assets::THUMBNAIL_FILE;
    use tempfile::TempDir;

    fn write_webp(path: &Path, edge: u32) {
        RgbaImage::from_pixel(edge, edge, Rgba([30, 120, 200, 255]))
            .save_with_format(path, ImageFormat::WebP)
            .unwrap();
    }

    fn setup() -> (TempDir, StickerConfig, StickerDatabase) {
        let tmp = TempDir::new().unwrap();
        let config = StickerConfig::rooted_at(tmp.path());
        fs::create_dir_all(&config.cache_dir).unwrap();
        fs::create_dir_all(&config.bundled_assets_dir).unwrap();
        write_webp(&config.bundled_assets_dir.join("placeholder_static.webp"), 512);
        for name in ["a.webp", "b.webp", "c.webp", "d.webp"] {
            write_webp(&config.cache_dir.join(name), 512);
        }
        write_webp(&config.cache_dir.join("small.webp"), 200);
        let db = StickerDatabase::in_memory().unwrap();
        (tmp, config, db)
    }

    fn request(id: &str, files: &[&str]) -> AssemblyRequest {
        AssemblyRequest {
            identifier: Some(id.to_string()),
            name: "Demo".to_string(),
            publisher: Some("Jane".to_string()),
            stickers: files.iter().map(|f| StagedSticker::new(f, &["😀"])).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_two_stickers_get_a_placeholder() {
        let (_tmp, config, db) = setup();
        let assembled = assemble_pack(&config, &db, request("abc123", &["a.webp", "b.webp"]))
            .into_data()
            .unwrap();

        assert_eq!(assembled.pack.stickers.len(), 3);
        let placeholder = &assembled.pack.stickers[2];
        assert_eq!(placeholder.image_file_name, "placeholder_static.webp");
        assert_eq!(placeholder.emojis, vec![PLACEHOLDER_EMOJI]);
        assert!(assembled.invalid_stickers.is_empty());
        assert_eq!(assembled.warning, None);

        let store = config.asset_store();
        assert!(store.asset_exists("abc123", THUMBNAIL_FILE).unwrap());
        assert!(store.asset_exists("abc123", "placeholder_static.webp").unwrap());
        let stored = pack_repository::select_by_identifier(&db.lock(), "abc123", false)
            .into_data()
            .unwrap();
        assert_eq!(stored.stickers.len(), 3);
        assert!(stored.stickers.iter().all(|s| s.size > 0));
    }

    #[test]
    fn test_duplicate_staged_files_are_dropped() {
        let (_tmp, config, db) = setup();
        let req = request("dupes", &["a.webp", "a.webp", "b.webp", "c.webp"]);
        let assembled = assemble_pack(&config, &db, req).into_data().unwrap();
        assert_eq!(
            assembled.pack.sticker_file_names(),
            vec!["a.webp", "b.webp", "c.webp"]
        );
    }

    #[test]
    fn test_generated_identifier_and_default_publisher() {
        let (_tmp, config, db) = setup();
        let mut req = request("", &["a.webp", "b.webp", "c.webp"]);
        req.publisher = None;
        let assembled = assemble_pack(&config, &db, req).into_data().unwrap();
        assert_eq!(assembled.pack.identifier.len(), 36);
        assert_eq!(assembled.pack.publisher, config.default_publisher);
    }

    #[test]
    fn test_invalid_sticker_is_marked_not_fatal() {
        let (_tmp, config, db) = setup();
        let outcome = assemble_pack(&config, &db, request("mixed", &["a.webp", "small.webp", "c.webp"]));
        let assembled = outcome.into_data().unwrap();

        assert_eq!(assembled.invalid_stickers.len(), 1);
        assert_eq!(assembled.invalid_stickers[0].code, ValidationCode::StickerDimensions);
        assert!(assembled.warning.is_some());

        let stickers = pack_repository::select_stickers(&db.lock(), "mixed").into_data().unwrap();
        assert_eq!(stickers[1].invalid_code.as_deref(), Some("ERROR_SIZE_STICKER"));
        assert!(stickers[0].is_valid());
    }

    #[test]
    fn test_missing_staged_file_leaves_nothing_behind() {
        let (_tmp, config, db) = setup();
        let outcome = assemble_pack(&config, &db, request("broken", &["a.webp", "b.webp", "gone.webp"]));
        assert!(outcome.is_failure());

        assert!(!pack_repository::pack_exists(&db.lock(), "broken").unwrap());
        assert!(!config.asset_store().pack_directory_exists("broken").unwrap());
    }

    #[test]
    fn test_missing_tray_source_aborts_before_insert() {
        let (_tmp, config, db) = setup();
        let mut req = request("notray", &["a.webp", "b.webp", "c.webp"]);
        req.tray_source = Some("tray.png".to_string());

        let outcome = assemble_pack(&config, &db, req);
        let code = outcome.error().and_then(|e| e.validation()).map(|v| v.code);
        assert_eq!(code, Some(ValidationCode::ThumbnailNotFound));
        assert!(!pack_repository::pack_exists(&db.lock(), "notray").unwrap());
        assert!(!config.asset_store().pack_directory_exists("notray").unwrap());
    }

    #[test]
    fn test_undecodable_tray_source_stops_assembly() {
        let (_tmp, config, db) = setup();
        fs::write(config.cache_dir.join("junk.webp"), b"junk").unwrap();
        let outcome = assemble_pack(&config, &db, request("junk", &["junk.webp", "a.webp", "b.webp"]));
        assert!(outcome.is_warning());
        assert!(!pack_repository::pack_exists(&db.lock(), "junk").unwrap());
        assert!(!config.asset_store().pack_directory_exists("junk").unwrap());
    }

    #[test]
    fn test_rejects_bad_identity_and_duplicates() {
        let (_tmp, config, db) = setup();
        let code = |o: Outcome<AssembledPack>| o.error().and_then(|e| e.validation()).map(|v| v.code);

        assert!(code(assemble_pack(&config, &db, request("a..b", &["a.webp"]))).is_some());
        assert!(!config.asset_store().pack_directory_exists("a..b").unwrap_or(false));

        assert_eq!(
            code(assemble_pack(&config, &db, request("empty", &[]))),
            Some(ValidationCode::InvalidPackSize)
        );

        let files = ["a.webp", "b.webp", "c.webp"];
        assert!(assemble_pack(&config, &db, request("twice", &files)).is_success());
        assert_eq!(
            code(assemble_pack(&config, &db, request("twice", &files))),
            Some(ValidationCode::DuplicateIdentifier)
        );
        assert!(config.asset_store().pack_directory_exists("twice").unwrap());
    }

    #[test]
    fn test_concurrent_assembly_of_one_identifier() {
        let (_tmp, config, db) = setup();
        let store = config.asset_store();

        for run in 0..20 {
            let id = format!("race{}", run);
            let outcomes: Vec<Outcome<AssembledPack>> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..2)
                    .map(|_| {
                        let id = id.as_str();
                        let (config, db) = (&config, &db);
                        scope.spawn(move || {
                            assemble_pack(config, db, request(id, &["a.webp", "b.webp", "c.webp"]))
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
            let loser = outcomes.iter().find(|o| !o.is_success()).unwrap();
            let code = loser.error().and_then(|e| e.validation()).map(|v| v.code);
            assert_eq!(code, Some(ValidationCode::DuplicateIdentifier));

            assert!(pack_repository::pack_exists(&db.lock(), &id).unwrap());
            assert_eq!(
                store.list_assets(&id).unwrap(),
                vec!["a.webp", "b.webp", "c.webp", THUMBNAIL_FILE]
            );
        }
    }

    #[test]
    fn test_leftover_directory_is_replaced() {
        let (_tmp, config, db) = setup();
        let store = config.asset_store();
        let (dir, _) = store.create_pack_directory("stale").unwrap();
        fs::write(dir.join("a.webp"), b"stale bytes").unwrap();
        fs::write(dir.join("old.webp"), b"stale bytes").unwrap();

        let assembled = assemble_pack(&config, &db, request("stale", &["a.webp", "b.webp", "c.webp"]))
            .into_data()
            .unwrap();
        assert!(assembled.invalid_stickers.is_empty());
        assert_eq!(
            store.list_assets("stale").unwrap(),
            vec!["a.webp", "b.webp", "c.webp", THUMBNAIL_FILE]
        );
        assert_eq!(
            store.read_asset("stale", "a.webp").unwrap(),
            fs::read(config.cache_dir.join("a.webp")).unwrap()
        );
    }

    #[test]
    fn test_reserved_identifier_is_rejected() {
        let (_tmp, config, db) = setup();
        let _held = PackReservation::acquire("held").unwrap();

        let outcome = assemble_pack(&config, &db, request("held", &["a.webp", "b.webp", "c.webp"]));
        let code = outcome.error().and_then(|e| e.validation()).map(|v| v.code);
        assert_eq!(code, Some(ValidationCode::DuplicateIdentifier));
        assert!(!config.asset_store().pack_directory_exists("held").unwrap());
    }

    #[tokio::test]
    async fn test_assemble_on_blocking_pool() {
        let (_tmp, config, db) = setup();
        let db = Arc::new(db);
        let outcome = assemble_pack_async(
            config.clone(),
            Arc::clone(&db),
            request("async", &["a.webp", "b.webp", "d.webp"]),
        )
        .await;
        assert!(outcome.is_success());
        assert!(pack_repository::pack_exists(&db.lock(), "async").unwrap());
    }
}
