use rusqlite::{Connection, Result};

pub const SCHEMA_VERSION: i32 = 1;

/// Creates the sticker tables when missing and records the schema version
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < SCHEMA_VERSION {
        create_schema(conn)?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
        log::info!("Sticker schema created (version {})", SCHEMA_VERSION);
    }

    Ok(())
}

fn create_schema(conn: &Connection) -> Result<()> {
    // Column names double as the cursor vocabulary the host app reads
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sticker_pack (
            sticker_pack_identifier TEXT PRIMARY KEY NOT NULL,
            sticker_pack_name TEXT NOT NULL,
            sticker_pack_publisher TEXT NOT NULL,
            sticker_pack_icon TEXT NOT NULL,
            sticker_pack_publisher_email TEXT,
            sticker_pack_publisher_website TEXT,
            sticker_pack_privacy_policy_website TEXT,
            sticker_pack_license_agreement_website TEXT,
            android_play_store_link TEXT,
            ios_app_download_link TEXT,
            image_data_version TEXT NOT NULL DEFAULT '1',
            whatsapp_will_not_cache_stickers INTEGER NOT NULL DEFAULT 0,
            animated_sticker_pack INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sticker (
            id_sticker INTEGER PRIMARY KEY AUTOINCREMENT,
            sticker_file_name TEXT NOT NULL,
            sticker_emoji TEXT,
            sticker_is_valid TEXT,
            sticker_accessibility_text TEXT,
            sticker_size INTEGER NOT NULL DEFAULT 0,
            fk_sticker_pack TEXT NOT NULL,
            UNIQUE (fk_sticker_pack, sticker_file_name),
            FOREIGN KEY (fk_sticker_pack) REFERENCES sticker_pack(sticker_pack_identifier)
                ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sticker_pack_fk ON sticker(fk_sticker_pack)",
        [],
    )?;

    // Any change to a sticker touches its pack
    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS update_sticker_pack_timestamp
         AFTER UPDATE ON sticker
         FOR EACH ROW
         BEGIN
            UPDATE sticker_pack SET updated_at = CURRENT_TIMESTAMP
            WHERE sticker_pack_identifier = NEW.fk_sticker_pack;
         END",
        [],
    )?;

    Ok(())
}
