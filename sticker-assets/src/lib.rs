//! # Sticker Assets
//!
//! Filesystem storage for sticker packs.
//!
//! Every pack owns one directory below the app files dir:
//!
//! ```text
//! <files_dir>/stickers_asset/<pack identifier>/<sticker>.webp
//! <files_dir>/stickers_asset/<pack identifier>/thumbnail.jpg
//! ```
//!
//! This crate provides:
//! - Directory creation and deletion (single file, file subset, whole pack)
//! - Copying converted stickers from the staging area into a pack directory
//! - Placeholder stickers that top a pack up to the minimum size
//! - JPEG tray thumbnails compressed down to a byte budget
//! - A WebP container inspector (canvas size, frame count, frame durations)
//!
//! It knows nothing about the metadata database. The application crate decides what
//! a missing directory or an undecodable image means for the caller.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use sticker_assets::{AssetLayout, AssetStore};
//!
//! let store = AssetStore::new(AssetLayout::new("/data/files", "/data/cache"));
//! let (dir, _state) = store.create_pack_directory("abc123")?;
//! store.copy_staged_files(["one.webp", "two.webp"], &dir)?;
//! ```

pub mod error;
pub mod layout;
pub mod placeholder;
pub mod store;
pub mod thumbnail;
pub mod webp;

pub use error::AssetError;
pub use layout::{AssetLayout, STICKERS_ASSET, THUMBNAIL_FILE, WARNING_IMAGE};
pub use placeholder::{PlaceholderGenerator, PlaceholderKind, PLACEHOLDER_ANIMATED, PLACEHOLDER_STATIC};
pub use store::{AssetStore, CopyReport, DirectoryState, Removal};
pub use thumbnail::{create_tray_thumbnail, probe_dimensions, TrayThumbnail};
pub use webp::{inspect_webp, WebpInfo};
