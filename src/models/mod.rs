pub mod cursor;
pub mod sticker;
pub mod sticker_pack;

pub use cursor::{CursorValue, MatrixCursor};
pub use sticker::Sticker;
pub use sticker_pack::StickerPack;
