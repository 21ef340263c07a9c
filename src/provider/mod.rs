//! Read-only content server the host messaging app queries for packs and assets.

pub mod columns;
pub mod uri;

use crate::config::StickerConfig;
use crate::database::StickerDatabase;
use crate::error::{ContractViolation, StickerError};
use crate::models::{MatrixCursor, Sticker};
use crate::outcome::{tri, Outcome};
use crate::services::{asset_service, pack_repository};
use crate::validation;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use sticker_assets::{AssetStore, WARNING_IMAGE};

pub use uri::{Route, RouteTable, METADATA, STICKERS};

pub const STICKER_MIME: &str = "image/webp";
pub const TRAY_MIME: &str = "image/jpg";

/// An asset opened read-only for a consumer.
#[derive(Debug)]
pub struct AssetHandle {
    pub file: File,
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub length: u64,
    /// The bundled warning image was served instead of the requested asset
    pub is_fallback: bool,
}

pub struct ContentServer {
    config: StickerConfig,
    db: Arc<StickerDatabase>,
    store: AssetStore,
    routes: RouteTable,
}

impl ContentServer {
    /// Fails when the configured authority does not start with the package name.
    pub fn new(config: StickerConfig, db: Arc<StickerDatabase>) -> Result<Self, StickerError> {
        if !config.authority.starts_with(&config.package_name) {
            return Err(ContractViolation::AuthorityPrefix {
                authority: config.authority.clone(),
                package_name: config.package_name.clone(),
            }
            .into());
        }
        Ok(Self {
            store: config.asset_store(),
            routes: RouteTable::new(&config.authority),
            config,
            db,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Answers `metadata`, `metadata/<id>` and `stickers/<id>`.
    ///
    /// Privileged callers see every sticker of a single pack; everyone else only the
    /// valid ones.
    pub fn query(&self, uri: &str, caller: Option<&str>) -> Outcome<MatrixCursor> {
        let route = match self.routes.match_uri(uri) {
            Ok(route) => route,
            Err(v) => return Outcome::failure(v),
        };
        log::debug!("query {} (route {}) from {:?}", uri, route.code(), caller);

        let conn = self.db.lock();
        match route {
            Route::AllPacks => {
                pack_repository::select_all(&conn).map(|packs| columns::pack_cursor(&packs))
            }
            Route::Pack(id) => {
                let filtered = !self.config.is_privileged(caller);
                pack_repository::select_by_identifier(&conn, &id, filtered)
                    .map(|pack| columns::pack_cursor(std::slice::from_ref(&pack)))
            }
            Route::Stickers(id) => pack_repository::select_stickers(&conn, &id)
                .map(|stickers| columns::sticker_cursor(&stickers)),
            Route::StickerAsset { .. } | Route::TrayIcon { .. } => {
                Outcome::failure(ContractViolation::UnknownUri(uri.to_string()))
            }
        }
    }

    /// MIME type of the resource behind `uri`.
    pub fn get_type(&self, uri: &str) -> Outcome<String> {
        let route = match self.routes.match_uri(uri) {
            Ok(route) => route,
            Err(v) => return Outcome::failure(v),
        };
        let authority = self.routes.authority();
        let mime = match route {
            Route::AllPacks => format!("vnd.android.cursor.dir/vnd.{}.{}", authority, METADATA),
            Route::Pack(_) => format!("vnd.android.cursor.item/vnd.{}.{}", authority, METADATA),
            Route::Stickers(_) => format!("vnd.android.cursor.dir/vnd.{}.{}", authority, STICKERS),
            Route::StickerAsset { .. } => STICKER_MIME.to_string(),
            Route::TrayIcon { .. } => TRAY_MIME.to_string(),
        };
        Outcome::Success(mime)
    }

    /// Opens a sticker or tray asset read-only.
    ///
    /// Privileged callers get the sticker re-validated and a typed failure (with the pack
    /// attached when it can be loaded) if anything is wrong. Other callers are not
    /// validated; when the file cannot be served they get the bundled warning image.
    /// Malformed URIs fail for everyone.
    pub fn open_asset(&self, uri: &str, caller: Option<&str>) -> Outcome<AssetHandle> {
        let (pack, file, is_tray) = match self.routes.match_uri(uri) {
            Ok(Route::StickerAsset { pack, file }) => (pack, file, false),
            Ok(Route::TrayIcon { pack, file }) => (pack, file, true),
            Ok(_) => return Outcome::failure(ContractViolation::UnknownUri(uri.to_string())),
            Err(v) => return Outcome::failure(v),
        };
        let privileged = self.config.is_privileged(caller);

        let error = match self.resolve_asset(&pack, &file, is_tray, privileged) {
            Outcome::Failure(e) => e,
            other => return other,
        };

        if privileged {
            let conn = self.db.lock();
            return match pack_repository::select_by_identifier(&conn, &pack, false) {
                Outcome::Success(loaded) => Outcome::Failure(error.with_pack(loaded)),
                _ => Outcome::Failure(error),
            };
        }

        log::warn!("Serving warning image for {}: {}", uri, error);
        match self.open_fallback() {
            Ok(handle) => Outcome::Success(handle),
            Err(e) => {
                log::error!("Warning image unavailable: {}", e);
                Outcome::Failure(error)
            }
        }
    }

    pub fn insert(&self, _uri: &str) -> Outcome<()> {
        Outcome::failure(ContractViolation::ReadOnly("insert"))
    }

    pub fn update(&self, _uri: &str) -> Outcome<()> {
        Outcome::failure(ContractViolation::ReadOnly("update"))
    }

    pub fn delete(&self, _uri: &str) -> Outcome<()> {
        Outcome::failure(ContractViolation::ReadOnly("delete"))
    }

    fn resolve_asset(&self, pack: &str, file: &str, is_tray: bool, privileged: bool) -> Outcome<AssetHandle> {
        match self.store.pack_directory_exists(pack) {
            Ok(true) => {}
            Ok(false) => {
                return Outcome::failure(ContractViolation::PackDirectoryMissing(pack.to_string()))
            }
            Err(e) => return Outcome::failure(asset_service::convert_error(e)),
        }
        match self.store.asset_exists(pack, file) {
            Ok(true) => {}
            Ok(false) => {
                return Outcome::failure(ContractViolation::AssetMissing(format!("{}/{}", pack, file)))
            }
            Err(e) => return Outcome::failure(asset_service::convert_error(e)),
        }

        if is_tray {
            return self.open(pack, file, TRAY_MIME);
        }

        if privileged {
            if !file.ends_with(".webp") {
                return Outcome::failure(ContractViolation::NotWebp(file.to_string()));
            }
            let stored = {
                let conn = self.db.lock();
                pack_repository::select_by_identifier(&conn, pack, false)
            };
            let stored = match stored {
                Outcome::Success(p) => p,
                Outcome::Failure(e) => return Outcome::Failure(e),
                _ => {
                    return Outcome::failure(ContractViolation::PackNotRegistered(pack.to_string()))
                }
            };
            let sticker = stored
                .sticker(file)
                .cloned()
                .unwrap_or_else(|| Sticker::new(pack, file, Vec::new()));
            tri!(validation::validate_sticker(
                &self.store,
                pack,
                &sticker,
                stored.animated_sticker_pack
            ));
        }

        self.open(pack, file, STICKER_MIME)
    }

    fn open(&self, pack: &str, file: &str, mime_type: &'static str) -> Outcome<AssetHandle> {
        let opened = self.store.layout().asset_path(pack, file).and_then(|path| {
            let handle = self.store.open_asset(pack, file)?;
            let length = self.store.asset_len(pack, file)?;
            Ok((path, handle, length))
        });
        match opened {
            Ok((path, file, length)) => Outcome::Success(AssetHandle {
                file,
                path,
                mime_type,
                length,
                is_fallback: false,
            }),
            Err(e) => Outcome::failure(asset_service::convert_error(e)),
        }
    }

    fn open_fallback(&self) -> std::io::Result<AssetHandle> {
        let path = self.config.bundled_assets_dir.join(WARNING_IMAGE);
        let file = File::open(&path)?;
        let length = file.metadata()?.len();
        Ok(AssetHandle {
            file,
            path,
            mime_type: STICKER_MIME,
            length,
            is_fallback: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationCode;
    use crate::models::StickerPack;
    use crate::outcome::OutcomeStatus;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    const WHATSAPP: Option<&str> = Some("com.whatsapp");
    const OTHER: Option<&str> = Some("com.other.app");

    struct Fixture {
        _tmp: TempDir,
        server: ContentServer,
        db: Arc<StickerDatabase>,
        store: AssetStore,
    }

    fn write_sticker(dir: &std::path::Path, name: &str, edge: u32) {
        RgbaImage::from_pixel(edge, edge, Rgba([1, 2, 3, 255]))
            .save_with_format(dir.join(name), ImageFormat::WebP)
            .unwrap();
    }

    /// Pack `abc123` with three stickers on disk; `b.webp` is marked invalid and undersized.
    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let config = StickerConfig::rooted_at(tmp.path());
        fs::create_dir_all(&config.bundled_assets_dir).unwrap();
        fs::write(config.bundled_assets_dir.join(WARNING_IMAGE), b"warning").unwrap();

        let db = Arc::new(StickerDatabase::in_memory().unwrap());
        let store = config.asset_store();
        let (dir, _) = store.create_pack_directory("abc123").unwrap();
        write_sticker(&dir, "a.webp", 512);
        write_sticker(&dir, "b.webp", 256);
        write_sticker(&dir, "c.webp", 512);
        fs::write(dir.join("thumbnail.jpg"), b"jpeg bytes").unwrap();
        fs::write(dir.join("notes.txt"), b"text").unwrap();

        let mut pack = StickerPack::new("abc123", "Demo", "Jane");
        for name in ["a.webp", "b.webp", "c.webp"] {
            pack.stickers.push(Sticker::new("abc123", name, vec!["😀".into()]));
        }
        pack.stickers[1].mark_invalid(ValidationCode::StickerDimensions);
        assert!(pack_repository::insert_pack(&db.lock(), &pack).is_success());

        let server = ContentServer::new(config, Arc::clone(&db)).unwrap();
        Fixture {
            _tmp: tmp,
            server,
            db,
            store,
        }
    }

    #[test]
    fn test_authority_must_start_with_package_name() {
        let mut config = StickerConfig::default();
        config.authority = "org.someone.else.provider".into();
        let db = Arc::new(StickerDatabase::in_memory().unwrap());
        let err = ContentServer::new(config, db).err().unwrap();
        assert!(matches!(
            err.contract(),
            Some(ContractViolation::AuthorityPrefix { .. })
        ));
    }

    #[test]
    fn test_metadata_lists_packs() {
        let f = fixture();
        let uri = f.server.routes().metadata_uri();
        let cursor = f.server.query(&uri, OTHER).into_data().unwrap();
        assert_eq!(cursor.len(), 1);
        assert_eq!(cursor.get_string(0, columns::STICKER_PACK_IDENTIFIER), Some("abc123"));
        assert_eq!(cursor.get_string(0, columns::STICKER_PACK_PUBLISHER), Some("Jane"));
    }

    #[test]
    fn test_empty_store_gives_empty_cursor() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(StickerDatabase::in_memory().unwrap());
        let server = ContentServer::new(StickerConfig::rooted_at(tmp.path()), db).unwrap();
        let cursor = server
            .query(&server.routes().metadata_uri(), None)
            .into_data()
            .unwrap();
        assert!(cursor.is_empty());
        assert_eq!(cursor.columns.len(), columns::PACK_COLUMNS.len());
    }

    #[test]
    fn test_single_pack_and_stickers() {
        let f = fixture();
        let pack_uri = f.server.routes().pack_uri("abc123");
        let cursor = f.server.query(&pack_uri, WHATSAPP).into_data().unwrap();
        assert_eq!(cursor.len(), 1);
        assert_eq!(cursor.get_string(0, columns::STICKER_PACK_NAME), Some("Demo"));

        let stickers_uri = f.server.routes().stickers_uri("abc123");
        let cursor = f.server.query(&stickers_uri, OTHER).into_data().unwrap();
        assert_eq!(cursor.len(), 3);
        assert_eq!(
            cursor.get_string(1, columns::STICKER_IS_VALID),
            Some("ERROR_SIZE_STICKER")
        );

        let missing = f.server.routes().pack_uri("nope");
        assert!(f.server.query(&missing, OTHER).is_warning());
    }

    #[test]
    fn test_unknown_route_fails() {
        let f = fixture();
        let uri = format!("content://{}/bogus", f.server.routes().authority());
        let outcome = f.server.query(&uri, None);
        assert!(matches!(
            outcome.error().and_then(|e| e.contract()),
            Some(ContractViolation::UnknownUri(_))
        ));

        let asset = f.server.routes().sticker_asset_uri("abc123", "a.webp");
        assert!(f.server.query(&asset, None).is_failure());
    }

    #[test]
    fn test_get_type() {
        let f = fixture();
        let routes = f.server.routes();
        let authority = routes.authority();
        let mime = |uri: String| f.server.get_type(&uri).into_data().unwrap();

        assert_eq!(
            mime(routes.metadata_uri()),
            format!("vnd.android.cursor.dir/vnd.{}.metadata", authority)
        );
        assert_eq!(
            mime(routes.pack_uri("abc123")),
            format!("vnd.android.cursor.item/vnd.{}.metadata", authority)
        );
        assert_eq!(
            mime(routes.stickers_uri("abc123")),
            format!("vnd.android.cursor.dir/vnd.{}.stickers", authority)
        );
        assert_eq!(mime(routes.sticker_asset_uri("abc123", "a.webp")), "image/webp");
        assert_eq!(mime(routes.sticker_asset_uri("abc123", "thumbnail.jpg")), "image/jpg");
    }

    #[test]
    fn test_open_valid_sticker_read_only() {
        let f = fixture();
        let uri = f.server.routes().sticker_asset_uri("abc123", "a.webp");
        let mut handle = f.server.open_asset(&uri, WHATSAPP).into_data().unwrap();

        assert!(!handle.is_fallback);
        assert_eq!(handle.mime_type, STICKER_MIME);
        let mut bytes = Vec::new();
        handle.file.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, handle.length);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert!(handle.file.metadata().unwrap().is_file());
    }

    #[test]
    fn test_tray_is_served_without_validation() {
        let f = fixture();
        let uri = f.server.routes().sticker_asset_uri("abc123", "thumbnail.jpg");
        let handle = f.server.open_asset(&uri, WHATSAPP).into_data().unwrap();
        assert_eq!(handle.mime_type, TRAY_MIME);
        assert_eq!(handle.length, 10);
    }

    #[test]
    fn test_privileged_failure_carries_pack() {
        let f = fixture();
        let uri = f.server.routes().sticker_asset_uri("abc123", "b.webp");
        let outcome = f.server.open_asset(&uri, WHATSAPP);

        let err = outcome.error().unwrap();
        assert_eq!(err.pack().unwrap().identifier, "abc123");
        let validation = err.validation().unwrap();
        assert_eq!(validation.code, ValidationCode::StickerDimensions);
        assert_eq!((validation.expected, validation.actual), (Some(512), Some(256)));

        let txt = f.server.routes().sticker_asset_uri("abc123", "notes.txt");
        assert!(matches!(
            f.server.open_asset(&txt, WHATSAPP).error().and_then(|e| e.contract()),
            Some(ContractViolation::NotWebp(_))
        ));
    }

    #[test]
    fn test_non_privileged_gets_fallback() {
        let f = fixture();
        // Unvalidated for ordinary callers
        let uri = f.server.routes().sticker_asset_uri("abc123", "b.webp");
        let handle = f.server.open_asset(&uri, OTHER).into_data().unwrap();
        assert!(!handle.is_fallback);

        let missing = f.server.routes().sticker_asset_uri("abc123", "gone.webp");
        let handle = f.server.open_asset(&missing, OTHER).into_data().unwrap();
        assert!(handle.is_fallback);
        assert!(handle.path.ends_with(WARNING_IMAGE));

        let privileged = f.server.open_asset(&missing, WHATSAPP);
        assert!(matches!(
            privileged.error().and_then(|e| e.contract()),
            Some(ContractViolation::AssetMissing(_))
        ));
    }

    #[test]
    fn test_missing_pack_directory() {
        let f = fixture();
        f.store.delete_pack_directory("abc123").unwrap();
        let uri = f.server.routes().sticker_asset_uri("abc123", "a.webp");
        let outcome = f.server.open_asset(&uri, WHATSAPP);
        assert!(matches!(
            outcome.error().and_then(|e| e.contract()),
            Some(ContractViolation::PackDirectoryMissing(_))
        ));
        assert!(outcome.error().unwrap().pack().is_some());
    }

    #[test]
    fn test_orphan_directory_is_not_served_to_privileged_caller() {
        let f = fixture();
        pack_repository::delete_pack(&f.db.lock(), "abc123");
        let uri = f.server.routes().sticker_asset_uri("abc123", "a.webp");
        assert!(matches!(
            f.server.open_asset(&uri, WHATSAPP).error().and_then(|e| e.contract()),
            Some(ContractViolation::PackNotRegistered(_))
        ));
    }

    #[test]
    fn test_two_segment_asset_uri_echoes_uri() {
        let f = fixture();
        let uri = format!("content://{}/stickers_asset/abc123", f.server.routes().authority());
        for caller in [WHATSAPP, OTHER, None] {
            let outcome = f.server.open_asset(&uri, caller);
            assert_eq!(outcome.status(), OutcomeStatus::Failure);
            match outcome.error().and_then(|e| e.contract()) {
                Some(ContractViolation::PathSegments { uri: echoed, .. }) => assert_eq!(echoed, &uri),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_writes_are_rejected() {
        let f = fixture();
        let uri = f.server.routes().metadata_uri();
        assert!(f.server.insert(&uri).is_failure());
        assert!(f.server.update(&uri).is_failure());
        assert!(f.server.delete(&uri).is_failure());
    }
}
