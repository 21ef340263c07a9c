//! Edits to the metadata of a stored pack.

use crate::database::StickerDatabase;
use crate::error::ValidationCode;
use crate::outcome::{tri, Outcome};
use crate::services::pack_repository;
use crate::validation;

/// Gives a stored pack a new display name.
///
/// The name goes through the same checks as at assembly; an unknown pack is a warning.
pub fn rename_pack(db: &StickerDatabase, pack_identifier: &str, new_name: &str) -> Outcome<()> {
    let conn = db.lock();
    let mut pack = tri!(pack_repository::select_by_identifier(&conn, pack_identifier, false));
    pack.name = new_name.trim().to_string();
    if let Err(e) = validation::check_identity(&pack) {
        return Outcome::failure(e);
    }

    tri!(pack_repository::update_pack_name(&conn, pack_identifier, &pack.name));
    log::info!("Renamed sticker pack {} to '{}'", pack_identifier, pack.name);
    Outcome::Success(())
}

/// Clears the links of a pack when one of them fails validation.
///
/// Packs whose links are all valid are left alone with a debug outcome.
pub fn clear_invalid_links(db: &StickerDatabase, pack_identifier: &str) -> Outcome<()> {
    let conn = db.lock();
    let pack = tri!(pack_repository::select_by_identifier(&conn, pack_identifier, false));
    let failed = match validation::check_links(&pack) {
        Ok(()) => None,
        Err(e) if e.code == ValidationCode::InvalidEmail => None,
        Err(e) => Some(e),
    };
    let Some(failed) = failed else {
        return Outcome::debug(format!("Links of pack {} are valid", pack_identifier));
    };

    log::warn!("Clearing links of pack {}: {}", pack_identifier, failed);
    tri!(pack_repository::clear_pack_urls(&conn, pack_identifier));
    Outcome::Success(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sticker, StickerPack};

    fn setup(website: Option<&str>) -> StickerDatabase {
        let db = StickerDatabase::in_memory().unwrap();
        let mut pack = StickerPack::new("p", "Demo", "Jane");
        pack.publisher_website = website.map(str::to_string);
        pack.stickers.push(Sticker::new("p", "a.webp", vec![]));
        assert!(pack_repository::insert_pack(&db.lock(), &pack).is_success());
        db
    }

    fn stored(db: &StickerDatabase) -> StickerPack {
        pack_repository::select_by_identifier(&db.lock(), "p", false)
            .into_data()
            .unwrap()
    }

    #[test]
    fn test_rename_pack() {
        let db = setup(None);
        assert!(rename_pack(&db, "p", "  Cats  ").is_success());
        assert_eq!(stored(&db).name, "Cats");

        let outcome = rename_pack(&db, "p", "");
        let code = outcome.error().and_then(|e| e.validation()).map(|v| v.code);
        assert_eq!(code, Some(ValidationCode::InvalidPackName));
        assert_eq!(stored(&db).name, "Cats");

        assert!(rename_pack(&db, "nope", "Dogs").is_warning());
    }

    #[test]
    fn test_clear_invalid_links() {
        let db = setup(Some("not a url"));
        assert!(clear_invalid_links(&db, "p").is_success());
        assert_eq!(stored(&db).publisher_website, None);
        assert!(clear_invalid_links(&db, "p").is_debug());
    }

    #[test]
    fn test_valid_links_are_kept() {
        let db = setup(Some("https://example.com"));
        assert!(clear_invalid_links(&db, "p").is_debug());
        assert_eq!(stored(&db).publisher_website.as_deref(), Some("https://example.com"));
        assert!(clear_invalid_links(&db, "nope").is_warning());
    }
}
