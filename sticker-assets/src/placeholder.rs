use crate::error::AssetError;
use crate::layout::check_component;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

pub const PLACEHOLDER_STATIC: &str = "placeholder_static.webp";
pub const PLACEHOLDER_ANIMATED: &str = "placeholder_animated.webp";

/// Which bundled filler a pack gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Static,
    Animated,
}

impl PlaceholderKind {
    pub fn for_pack(animated: bool) -> Self {
        if animated {
            PlaceholderKind::Animated
        } else {
            PlaceholderKind::Static
        }
    }

    /// Name of the bundled template, also the name of the first placeholder in a pack.
    pub fn template_name(&self) -> &'static str {
        match self {
            PlaceholderKind::Static => PLACEHOLDER_STATIC,
            PlaceholderKind::Animated => PLACEHOLDER_ANIMATED,
        }
    }

    /// `placeholder_static.webp`, `placeholder_static_1.webp`, ...
    pub fn file_name(&self, index: usize) -> String {
        if index == 0 {
            return self.template_name().to_string();
        }
        let stem = self.template_name().trim_end_matches(".webp");
        format!("{}_{}.webp", stem, index)
    }

    pub fn is_placeholder(file_name: &str) -> bool {
        file_name.starts_with("placeholder_static") || file_name.starts_with("placeholder_animated")
    }
}

fn in_flight() -> &'static Mutex<HashSet<String>> {
    static IN_FLIGHT: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    IN_FLIGHT.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Marks one pack as having a placeholder generation in progress until dropped.
#[derive(Debug)]
struct InFlightGuard {
    pack_identifier: String,
}

impl InFlightGuard {
    fn acquire(pack_identifier: &str) -> Option<Self> {
        let mut set = in_flight().lock().unwrap_or_else(|p| p.into_inner());
        if !set.insert(pack_identifier.to_string()) {
            return None;
        }
        Some(Self {
            pack_identifier: pack_identifier.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = in_flight().lock().unwrap_or_else(|p| p.into_inner());
        set.remove(&self.pack_identifier);
    }
}

/// Copies bundled placeholder templates into the staging area.
#[derive(Debug, Clone)]
pub struct PlaceholderGenerator {
    templates_dir: PathBuf,
    staging_dir: PathBuf,
}

impl PlaceholderGenerator {
    pub fn new(templates_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            staging_dir: staging_dir.into(),
        }
    }

    /// Stages enough placeholders for `existing` to reach `minimum` entries and returns
    /// the names that were added, in order.
    ///
    /// Returns `Ok(None)` when another generation for the same pack is already running;
    /// the caller should retry later.
    pub fn fill_to_minimum(
        &self,
        pack_identifier: &str,
        kind: PlaceholderKind,
        existing: &[String],
        minimum: usize,
    ) -> Result<Option<Vec<String>>, AssetError> {
        let Some(_guard) = InFlightGuard::acquire(pack_identifier) else {
            log::warn!(
                "Placeholder generation already running for pack {}",
                pack_identifier
            );
            return Ok(None);
        };

        let mut added = Vec::new();
        let mut index = 0;
        while existing.len() + added.len() < minimum {
            let name = kind.file_name(index);
            index += 1;
            if existing.contains(&name) {
                continue;
            }
            self.stage_copy(kind, &name)?;
            added.push(name);
        }

        if !added.is_empty() {
            log::info!(
                "Added {} placeholder(s) to pack {}",
                added.len(),
                pack_identifier
            );
        }
        Ok(Some(added))
    }

    fn stage_copy(&self, kind: PlaceholderKind, name: &str) -> Result<(), AssetError> {
        check_component(name)?;
        let target = self.staging_dir.join(name);
        if target.is_file() {
            return Ok(());
        }

        let template = self.templates_dir.join(kind.template_name());
        if !template.is_file() {
            return Err(AssetError::NotFound(template));
        }

        fs::create_dir_all(&self.staging_dir).map_err(AssetError::io(&self.staging_dir))?;
        // Concurrent packs share the staging area, so publish the copy with a rename
        static PARTIAL_SEQ: AtomicUsize = AtomicUsize::new(0);
        let seq = PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed);
        let partial = self.staging_dir.join(format!(".{}.{}.part", name, seq));
        fs::copy(&template, &partial).map_err(AssetError::io(&partial))?;
        fs::rename(&partial, &target).map_err(AssetError::io(&target))?;
        Ok(())
    }
}
