//! Rules a pack and its stickers must pass before the host app accepts them.
//!
//! The `check_*` functions are pure and return the first broken rule. `validate_pack`
//! and `validate_sticker` read the files they need from the asset store and report
//! through [`Outcome`](crate::outcome::Outcome).

pub mod pack;
pub mod sticker;

pub use pack::{check_identity, check_links, check_pack_metadata, check_sticker_count, check_tray_image, validate_pack};
pub use sticker::{check_accessibility, check_sticker_bytes, check_sticker_info, validate_sticker};
