//! Limits a pack must respect before the host app accepts it.

/// Stickers are square images of exactly this edge length.
pub const STICKER_EDGE_PX: u32 = 512;
pub const STATIC_STICKER_MAX_BYTES: u64 = 100 * 1024;
pub const ANIMATED_STICKER_MAX_BYTES: u64 = 500 * 1024;

pub const FRAME_MIN_DURATION_MS: u32 = 8;
pub const ANIMATION_MAX_DURATION_MS: u64 = 10_000;

pub const TRAY_MIN_EDGE_PX: u32 = 24;
pub const TRAY_MAX_EDGE_PX: u32 = 512;
pub const TRAY_MAX_BYTES: u64 = 50 * 1024;

pub const STATIC_ACCESSIBILITY_MAX_CHARS: usize = 125;
pub const ANIMATED_ACCESSIBILITY_MAX_CHARS: usize = 255;

/// Identifier, name and publisher.
pub const NAME_MAX_CHARS: usize = 128;

pub const MIN_STICKERS: usize = 3;
pub const MAX_STICKERS: usize = 30;

pub const PLAY_STORE_DOMAIN: &str = "play.google.com";
pub const APPLE_STORE_DOMAIN: &str = "itunes.apple.com";
