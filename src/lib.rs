//! Sticker pack core for a WhatsApp-compatible sticker app.
//!
//! Packs are assembled from staged files, validated against the host app's rules, stored
//! on disk and in SQLite, and served read-only through [`provider::ContentServer`].

pub mod config;
pub mod database;
pub mod error;
pub mod filesystem;
pub mod image_processing;
pub mod limits;
pub mod logging;
pub mod models;
pub mod outcome;
pub mod provider;
pub mod services;
pub mod validation;

pub use config::StickerConfig;
pub use database::StickerDatabase;
pub use error::{ContractViolation, StickerError, ValidationCode, ValidationError};
pub use models::{MatrixCursor, Sticker, StickerPack};
pub use outcome::{Outcome, OutcomeStatus};
pub use provider::ContentServer;
