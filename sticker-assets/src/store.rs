use crate::error::AssetError;
use crate::layout::AssetLayout;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether a directory was made by the call or was already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState {
    Created,
    AlreadyExisted,
}

/// Whether a delete removed something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Missing,
}

/// Files touched by [`AssetStore::copy_staged_files`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: Vec<String>,
    pub skipped: Vec<String>,
}

/// Pack directory storage rooted at an [`AssetLayout`].
#[derive(Debug, Clone)]
pub struct AssetStore {
    layout: AssetLayout,
}

impl AssetStore {
    pub fn new(layout: AssetLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }

    /// Creates `<files_dir>/stickers_asset`.
    pub fn create_main_directory(&self) -> Result<DirectoryState, AssetError> {
        ensure_dir(&self.layout.root())
    }

    /// Creates the directory of one pack. Calling it again for the same pack is not an error.
    pub fn create_pack_directory(
        &self,
        pack_identifier: &str,
    ) -> Result<(PathBuf, DirectoryState), AssetError> {
        let dir = self.layout.pack_dir(pack_identifier)?;
        let state = ensure_dir(&dir)?;
        Ok((dir, state))
    }

    pub fn pack_directory_exists(&self, pack_identifier: &str) -> Result<bool, AssetError> {
        Ok(self.layout.pack_dir(pack_identifier)?.is_dir())
    }

    pub fn asset_exists(&self, pack_identifier: &str, file_name: &str) -> Result<bool, AssetError> {
        Ok(self.layout.asset_path(pack_identifier, file_name)?.is_file())
    }

    /// Copies staged files into `dest_dir`.
    ///
    /// A name listed twice is copied once, and a destination file that already exists is
    /// left alone. The first missing source or I/O error aborts the copy; files copied
    /// before that point stay in place.
    pub fn copy_staged_files<'a, I>(&self, file_names: I, dest_dir: &Path) -> Result<CopyReport, AssetError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut files_already_copied: HashSet<&str> = HashSet::new();
        let mut report = CopyReport::default();

        for name in file_names {
            if !files_already_copied.insert(name) {
                report.skipped.push(name.to_string());
                continue;
            }

            let source = self.layout.staged_path(name)?;
            let target = dest_dir.join(name);

            if target.exists() {
                log::debug!("Asset already present, skipping copy: {:?}", target);
                report.skipped.push(name.to_string());
                continue;
            }
            if !source.is_file() {
                log::error!("Staged file missing: {:?}", source);
                return Err(AssetError::NotFound(source));
            }

            fs::copy(&source, &target).map_err(AssetError::io(&target))?;
            report.copied.push(name.to_string());
        }

        log::debug!(
            "Copied {} staged file(s) to {:?}, skipped {}",
            report.copied.len(),
            dest_dir,
            report.skipped.len()
        );
        Ok(report)
    }

    pub fn read_asset(&self, pack_identifier: &str, file_name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.existing_asset(pack_identifier, file_name)?;
        fs::read(&path).map_err(AssetError::io(path))
    }

    /// Opens an asset read-only.
    pub fn open_asset(&self, pack_identifier: &str, file_name: &str) -> Result<fs::File, AssetError> {
        let path = self.existing_asset(pack_identifier, file_name)?;
        fs::File::open(&path).map_err(AssetError::io(path))
    }

    pub fn asset_len(&self, pack_identifier: &str, file_name: &str) -> Result<u64, AssetError> {
        let path = self.existing_asset(pack_identifier, file_name)?;
        let meta = fs::metadata(&path).map_err(AssetError::io(path))?;
        Ok(meta.len())
    }

    /// File names inside a pack directory, sorted.
    pub fn list_assets(&self, pack_identifier: &str) -> Result<Vec<String>, AssetError> {
        let dir = self.layout.pack_dir(pack_identifier)?;
        list_names(&dir, |entry| entry.is_file())
    }

    /// Names of all pack directories, sorted.
    pub fn list_pack_directories(&self) -> Result<Vec<String>, AssetError> {
        let root = self.layout.root();
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        list_names(&root, |entry| entry.is_dir())
    }

    pub fn delete_asset(&self, pack_identifier: &str, file_name: &str) -> Result<Removal, AssetError> {
        let path = self.layout.asset_path(pack_identifier, file_name)?;
        remove_file(&path)
    }

    /// Deletes the listed files of one pack and returns how many were actually removed.
    pub fn delete_asset_subset<S: AsRef<str>>(
        &self,
        pack_identifier: &str,
        file_names: &[S],
    ) -> Result<usize, AssetError> {
        let mut removed = 0;
        for name in file_names {
            if self.delete_asset(pack_identifier, name.as_ref())? == Removal::Removed {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Deletes every file of a pack but keeps the directory.
    pub fn delete_all_assets(&self, pack_identifier: &str) -> Result<Removal, AssetError> {
        let dir = self.layout.pack_dir(pack_identifier)?;
        if !dir.is_dir() {
            return Ok(Removal::Missing);
        }
        for name in list_names(&dir, |entry| entry.is_file())? {
            remove_file(&dir.join(name))?;
        }
        Ok(Removal::Removed)
    }

    /// Deletes the files of a pack, then the directory itself.
    pub fn delete_pack_directory(&self, pack_identifier: &str) -> Result<Removal, AssetError> {
        if self.delete_all_assets(pack_identifier)? == Removal::Missing {
            return Ok(Removal::Missing);
        }
        let dir = self.layout.pack_dir(pack_identifier)?;
        fs::remove_dir_all(&dir).map_err(AssetError::io(&dir))?;
        log::info!("Deleted pack directory {:?}", dir);
        Ok(Removal::Removed)
    }

    fn existing_asset(&self, pack_identifier: &str, file_name: &str) -> Result<PathBuf, AssetError> {
        let path = self.layout.asset_path(pack_identifier, file_name)?;
        if !path.is_file() {
            return Err(AssetError::NotFound(path));
        }
        Ok(path)
    }
}

fn ensure_dir(dir: &Path) -> Result<DirectoryState, AssetError> {
    if dir.is_dir() {
        log::debug!("Directory already exists: {:?}", dir);
        return Ok(DirectoryState::AlreadyExisted);
    }
    fs::create_dir_all(dir).map_err(AssetError::io(dir))?;
    log::debug!("Created directory {:?}", dir);
    Ok(DirectoryState::Created)
}

fn remove_file(path: &Path) -> Result<Removal, AssetError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(Removal::Removed),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Removal::Missing),
        Err(e) => Err(AssetError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn list_names(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<String>, AssetError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(AssetError::io(dir))? {
        let entry = entry.map_err(AssetError::io(dir))?;
        let path = entry.path();
        if !keep(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(tmp: &TempDir) -> AssetStore {
        let files = tmp.path().join("files");
        let cache = tmp.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        AssetStore::new(AssetLayout::new(files, cache))
    }

    fn stage(store: &AssetStore, name: &str, bytes: &[u8]) {
        fs::write(store.layout().staged_path(name).unwrap(), bytes).unwrap();
    }

    #[test]
    fn test_create_pack_directory_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        assert_eq!(store.create_main_directory().unwrap(), DirectoryState::Created);
        assert_eq!(store.create_main_directory().unwrap(), DirectoryState::AlreadyExisted);

        let (dir, first) = store.create_pack_directory("abc123").unwrap();
        let (again, second) = store.create_pack_directory("abc123").unwrap();
        assert_eq!(first, DirectoryState::Created);
        assert_eq!(second, DirectoryState::AlreadyExisted);
        assert_eq!(dir, again);
        assert!(dir.ends_with("stickers_asset/abc123"));
    }

    #[test]
    fn test_copy_skips_duplicates_and_existing() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        stage(&store, "a.webp", b"a");
        stage(&store, "b.webp", b"b");
        let (dir, _) = store.create_pack_directory("p1").unwrap();
        fs::write(dir.join("b.webp"), b"old").unwrap();

        let report = store
            .copy_staged_files(["a.webp", "b.webp", "a.webp"], &dir)
            .unwrap();

        assert_eq!(report.copied, vec!["a.webp".to_string()]);
        assert_eq!(report.skipped, vec!["b.webp".to_string(), "a.webp".to_string()]);
        // Existing destination is not overwritten
        assert_eq!(fs::read(dir.join("b.webp")).unwrap(), b"old");
    }

    #[test]
    fn test_copy_fails_fast_on_missing_source() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        stage(&store, "a.webp", b"a");
        stage(&store, "c.webp", b"c");
        let (dir, _) = store.create_pack_directory("p1").unwrap();

        let err = store
            .copy_staged_files(["a.webp", "missing.webp", "c.webp"], &dir)
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(dir.join("a.webp").exists());
        assert!(!dir.join("c.webp").exists());
    }

    #[test]
    fn test_delete_variants() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let (dir, _) = store.create_pack_directory("p1").unwrap();
        for name in ["a.webp", "b.webp", "c.webp", "thumbnail.jpg"] {
            fs::write(dir.join(name), b"x").unwrap();
        }

        assert_eq!(store.delete_asset("p1", "a.webp").unwrap(), Removal::Removed);
        assert_eq!(store.delete_asset("p1", "a.webp").unwrap(), Removal::Missing);

        let removed = store
            .delete_asset_subset("p1", &["b.webp", "nope.webp"])
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(
            store.list_assets("p1").unwrap(),
            vec!["c.webp".to_string(), "thumbnail.jpg".to_string()]
        );

        assert_eq!(store.delete_all_assets("p1").unwrap(), Removal::Removed);
        assert!(dir.is_dir());
        assert!(store.list_assets("p1").unwrap().is_empty());

        assert_eq!(store.delete_pack_directory("p1").unwrap(), Removal::Removed);
        assert!(!dir.exists());
        assert_eq!(store.delete_pack_directory("p1").unwrap(), Removal::Missing);
        assert_eq!(store.delete_all_assets("p1").unwrap(), Removal::Missing);
    }

    #[test]
    fn test_read_and_list() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        assert!(store.list_pack_directories().unwrap().is_empty());

        let (dir, _) = store.create_pack_directory("zeta").unwrap();
        store.create_pack_directory("alpha").unwrap();
        fs::write(dir.join("one.webp"), b"12345").unwrap();

        assert_eq!(
            store.list_pack_directories().unwrap(),
            vec!["alpha".to_string(), "zeta".to_string()]
        );
        assert_eq!(store.read_asset("zeta", "one.webp").unwrap(), b"12345");
        assert_eq!(store.asset_len("zeta", "one.webp").unwrap(), 5);
        assert!(store.asset_exists("zeta", "one.webp").unwrap());
        assert!(store.read_asset("zeta", "two.webp").unwrap_err().is_not_found());
        assert!(store.open_asset("alpha", "one.webp").is_err());
    }
}
