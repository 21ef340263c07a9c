use crate::error::{StickerError, ValidationCode, ValidationError};
use crate::models::{Sticker, StickerPack};
use crate::outcome::Outcome;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::collections::BTreeMap;

const PACK_COLUMNS: &str = "p.sticker_pack_identifier, p.sticker_pack_name, p.sticker_pack_publisher,
     p.sticker_pack_icon, p.sticker_pack_publisher_email, p.sticker_pack_publisher_website,
     p.sticker_pack_privacy_policy_website, p.sticker_pack_license_agreement_website,
     p.android_play_store_link, p.ios_app_download_link, p.image_data_version,
     p.whatsapp_will_not_cache_stickers, p.animated_sticker_pack, p.created_at";

const STICKER_COLUMNS: &str = "s.sticker_file_name, s.sticker_emoji, s.sticker_is_valid,
     s.sticker_accessibility_text, s.sticker_size, s.fk_sticker_pack";

const VALID_ONLY: &str = "(s.sticker_is_valid IS NULL OR s.sticker_is_valid = '')";

/// Stores a pack and all of its stickers in one transaction.
///
/// An identifier that is already taken fails with `DUPLICATE_IDENTIFIER`.
pub fn insert_pack(conn: &Connection, pack: &StickerPack) -> Outcome<StickerPack> {
    let mut stored = pack.clone();
    stored.created_at = Some(Utc::now());

    let result = (|| -> Result<(), rusqlite::Error> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO sticker_pack (
                sticker_pack_identifier, sticker_pack_name, sticker_pack_publisher,
                sticker_pack_icon, sticker_pack_publisher_email, sticker_pack_publisher_website,
                sticker_pack_privacy_policy_website, sticker_pack_license_agreement_website,
                android_play_store_link, ios_app_download_link, image_data_version,
                whatsapp_will_not_cache_stickers, animated_sticker_pack, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                stored.identifier,
                stored.name,
                stored.publisher,
                stored.tray_image_file,
                stored.publisher_email,
                stored.publisher_website,
                stored.privacy_policy_website,
                stored.license_agreement_website,
                stored.android_play_store_link,
                stored.ios_app_store_link,
                stored.image_data_version,
                stored.avoid_cache,
                stored.animated_sticker_pack,
                stored.created_at,
            ],
        )?;
        for sticker in &stored.stickers {
            insert_sticker_row(&tx, sticker, &stored.identifier)?;
        }
        tx.commit()
    })();

    match result {
        Ok(()) => {
            log::info!(
                "Inserted sticker pack {} with {} sticker(s)",
                stored.identifier,
                stored.stickers.len()
            );
            Outcome::Success(stored)
        }
        Err(e) if is_constraint_violation(&e) => Outcome::failure(ValidationError::new(
            ValidationCode::DuplicateIdentifier,
            &pack.identifier,
            format!("a pack or sticker with this identifier already exists: {}", e),
        )),
        Err(e) => Outcome::failure(e),
    }
}

pub fn insert_sticker(conn: &Connection, sticker: &Sticker, pack_identifier: &str) -> Outcome<()> {
    Outcome::from_result(insert_sticker_row(conn, sticker, pack_identifier))
}

/// All packs with all of their stickers, ordered by identifier.
pub fn select_all(conn: &Connection) -> Outcome<Vec<StickerPack>> {
    Outcome::from_result(load_packs(conn, None, false))
}

/// One pack. With `filtered`, stickers marked invalid are left out.
///
/// An unknown identifier is a warning, not a failure.
pub fn select_by_identifier(conn: &Connection, identifier: &str, filtered: bool) -> Outcome<StickerPack> {
    match load_packs(conn, Some(identifier), filtered) {
        Ok(mut packs) => match packs.pop() {
            Some(pack) => Outcome::Success(pack),
            None => Outcome::warning(format!("No sticker pack found for identifier {}", identifier)),
        },
        Err(e) => Outcome::failure(e),
    }
}

pub fn select_stickers(conn: &Connection, identifier: &str) -> Outcome<Vec<Sticker>> {
    let result = (|| -> Result<Vec<Sticker>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sticker s WHERE s.fk_sticker_pack = ?1 ORDER BY s.id_sticker",
            STICKER_COLUMNS
        ))?;
        let rows = stmt.query_map([identifier], |row| Sticker::try_from(row))?;
        rows.collect()
    })();
    Outcome::from_result(result)
}

pub fn is_pack_animated(conn: &Connection, identifier: &str) -> Outcome<bool> {
    let result = conn
        .query_row(
            "SELECT animated_sticker_pack FROM sticker_pack WHERE sticker_pack_identifier = ?1",
            [identifier],
            |row| row.get::<_, bool>(0),
        )
        .optional();
    match result {
        Ok(Some(animated)) => Outcome::Success(animated),
        Ok(None) => Outcome::warning(format!("No sticker pack found for identifier {}", identifier)),
        Err(e) => Outcome::failure(e),
    }
}

pub fn pack_exists(conn: &Connection, identifier: &str) -> Result<bool, StickerError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sticker_pack WHERE sticker_pack_identifier = ?1",
            [identifier],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn pack_identifiers(conn: &Connection) -> Result<Vec<String>, StickerError> {
    let mut stmt =
        conn.prepare("SELECT sticker_pack_identifier FROM sticker_pack ORDER BY sticker_pack_identifier")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Deletes a pack row; its stickers go with it.
pub fn delete_pack(conn: &Connection, identifier: &str) -> Outcome<usize> {
    affected(
        conn.execute(
            "DELETE FROM sticker_pack WHERE sticker_pack_identifier = ?1",
            [identifier],
        ),
        || format!("Nothing deleted for sticker pack {}", identifier),
    )
}

pub fn delete_sticker(conn: &Connection, identifier: &str, file_name: &str) -> Outcome<usize> {
    affected(
        conn.execute(
            "DELETE FROM sticker WHERE fk_sticker_pack = ?1 AND sticker_file_name = ?2",
            [identifier, file_name],
        ),
        || format!("Nothing deleted for sticker {} in pack {}", file_name, identifier),
    )
}

pub fn delete_stickers<S: AsRef<str>>(conn: &Connection, identifier: &str, file_names: &[S]) -> Outcome<usize> {
    if file_names.is_empty() {
        return Outcome::warning(format!("No sticker names given for pack {}", identifier));
    }
    let placeholders = (0..file_names.len())
        .map(|i| format!("?{}", i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "DELETE FROM sticker WHERE fk_sticker_pack = ?1 AND sticker_file_name IN ({})",
        placeholders
    );
    let values = std::iter::once(identifier).chain(file_names.iter().map(|f| f.as_ref()));
    affected(
        conn.execute(&sql, params_from_iter(values)),
        || format!("Nothing deleted for {} sticker(s) in pack {}", file_names.len(), identifier),
    )
}

/// Records why a sticker failed validation.
pub fn mark_sticker_invalid(
    conn: &Connection,
    identifier: &str,
    file_name: &str,
    code: ValidationCode,
) -> Outcome<usize> {
    affected(
        conn.execute(
            "UPDATE sticker SET sticker_is_valid = ?1
             WHERE fk_sticker_pack = ?2 AND sticker_file_name = ?3",
            [code.as_str(), identifier, file_name],
        ),
        || format!("No sticker {} in pack {} to mark invalid", file_name, identifier),
    )
}

pub fn clear_sticker_invalid(conn: &Connection, identifier: &str, file_name: &str) -> Outcome<usize> {
    affected(
        conn.execute(
            "UPDATE sticker SET sticker_is_valid = NULL
             WHERE fk_sticker_pack = ?1 AND sticker_file_name = ?2",
            [identifier, file_name],
        ),
        || format!("No sticker {} in pack {} to clear", file_name, identifier),
    )
}

/// Points a sticker row at a replacement file and clears its validity marker.
pub fn rename_sticker_file(
    conn: &Connection,
    identifier: &str,
    old_name: &str,
    new_name: &str,
) -> Outcome<usize> {
    affected(
        conn.execute(
            "UPDATE sticker SET sticker_file_name = ?1, sticker_is_valid = NULL
             WHERE fk_sticker_pack = ?2 AND sticker_file_name = ?3",
            [new_name, identifier, old_name],
        ),
        || format!("No sticker {} in pack {} to rename", old_name, identifier),
    )
}

pub fn update_pack_name(conn: &Connection, identifier: &str, name: &str) -> Outcome<usize> {
    affected(
        conn.execute(
            "UPDATE sticker_pack SET sticker_pack_name = ?1 WHERE sticker_pack_identifier = ?2",
            [name, identifier],
        ),
        || format!("No sticker pack {} to rename", identifier),
    )
}

/// Drops every link of a pack: store links and publisher URLs.
pub fn clear_pack_urls(conn: &Connection, identifier: &str) -> Outcome<usize> {
    affected(
        conn.execute(
            "UPDATE sticker_pack SET
                sticker_pack_publisher_website = NULL,
                sticker_pack_privacy_policy_website = NULL,
                sticker_pack_license_agreement_website = NULL,
                android_play_store_link = NULL,
                ios_app_download_link = NULL
             WHERE sticker_pack_identifier = ?1",
            [identifier],
        ),
        || format!("No sticker pack {} to clear links of", identifier),
    )
}

/// Increments the pack's image data version so cached stickers get refreshed.
/// Returns the new version.
pub fn bump_image_data_version(conn: &Connection, identifier: &str) -> Outcome<String> {
    let result = conn
        .query_row(
            "UPDATE sticker_pack
             SET image_data_version = CAST(CAST(image_data_version AS INTEGER) + 1 AS TEXT)
             WHERE sticker_pack_identifier = ?1
             RETURNING image_data_version",
            [identifier],
            |row| row.get::<_, String>(0),
        )
        .optional();
    match result {
        Ok(Some(version)) => {
            log::debug!("Image data version of pack {} is now {}", identifier, version);
            Outcome::Success(version)
        }
        Ok(None) => Outcome::warning(format!("No sticker pack {} to bump the version of", identifier)),
        Err(e) => Outcome::failure(e),
    }
}

fn insert_sticker_row(conn: &Connection, sticker: &Sticker, pack_identifier: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO sticker (
            sticker_file_name, sticker_emoji, sticker_is_valid,
            sticker_accessibility_text, sticker_size, fk_sticker_pack)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            sticker.image_file_name,
            sticker.emoji_column(),
            sticker.invalid_code,
            sticker.accessibility_text,
            i64::try_from(sticker.size).unwrap_or(i64::MAX),
            pack_identifier,
        ],
    )?;
    Ok(())
}

/// Loads packs from a pack/sticker join.
///
/// Rows are grouped by identifier in a map, so the result does not depend on the
/// order SQLite returns them in. Packs without stickers are kept.
fn load_packs(
    conn: &Connection,
    identifier: Option<&str>,
    filtered: bool,
) -> Result<Vec<StickerPack>, rusqlite::Error> {
    let join_filter = if filtered {
        format!(" AND {}", VALID_ONLY)
    } else {
        String::new()
    };
    let where_clause = if identifier.is_some() {
        " WHERE p.sticker_pack_identifier = ?1"
    } else {
        ""
    };
    let sql = format!(
        "SELECT {}, {} FROM sticker_pack p
         LEFT JOIN sticker s ON s.fk_sticker_pack = p.sticker_pack_identifier{}{}
         ORDER BY s.id_sticker",
        PACK_COLUMNS, STICKER_COLUMNS, join_filter, where_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match identifier {
        Some(id) => stmt.query([id])?,
        None => stmt.query([])?,
    };

    let mut packs: BTreeMap<String, StickerPack> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get("sticker_pack_identifier")?;
        if !packs.contains_key(&id) {
            packs.insert(id.clone(), StickerPack::try_from(row)?);
        }
        let file: Option<String> = row.get("sticker_file_name")?;
        if file.is_some() {
            let sticker = Sticker::try_from(row)?;
            if let Some(pack) = packs.get_mut(&id) {
                pack.stickers.push(sticker);
            }
        }
    }

    Ok(packs.into_values().collect())
}

fn affected(result: Result<usize, rusqlite::Error>, nothing: impl FnOnce() -> String) -> Outcome<usize> {
    match result {
        Ok(0) => Outcome::warning(nothing()),
        Ok(n) => Outcome::Success(n),
        Err(e) => Outcome::failure(e),
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}
