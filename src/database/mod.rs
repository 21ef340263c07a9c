pub mod schema;

use crate::config::StickerConfig;
use crate::error::StickerError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// One SQLite connection shared by every repository call.
#[derive(Debug)]
pub struct StickerDatabase {
    conn: Mutex<Connection>,
}

impl StickerDatabase {
    /// Opens (and if needed creates) the database file with the full schema
    pub fn open(path: &Path) -> Result<Self, StickerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StickerError::from_io(parent))?;
        }
        let conn = Connection::open(path)?;
        schema::init_schema(&conn)?;
        log::info!("Opened sticker database at {:?}", path);
        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self, StickerError> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Locks the connection. A panic in another holder does not make it unusable.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }
}

static SHARED: OnceLock<Arc<StickerDatabase>> = OnceLock::new();

/// Process-wide database, opened lazily from `config` on first use.
///
/// Later calls return the same handle regardless of the config passed.
pub fn shared(config: &StickerConfig) -> Result<Arc<StickerDatabase>, StickerError> {
    if let Some(db) = SHARED.get() {
        return Ok(Arc::clone(db));
    }
    let db = Arc::new(StickerDatabase::open(&config.database_path())?);
    // A concurrent first call may have won; keep whichever was stored
    let _ = SHARED.set(db);
    SHARED
        .get()
        .cloned()
        .ok_or_else(|| StickerError::Config("database handle was not stored".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_file_and_schema() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/stickers.db");
        let db = StickerDatabase::open(&path).unwrap();
        assert!(path.exists());

        let count: i32 = db
            .lock()
            .query_row("SELECT COUNT(*) FROM sticker_pack", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_shared_handle_is_reused() {
        let tmp = TempDir::new().unwrap();
        let config = StickerConfig::rooted_at(tmp.path());
        let first = shared(&config).unwrap();
        let second = shared(&StickerConfig::rooted_at(&tmp.path().join("other"))).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
