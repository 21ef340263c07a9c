use crate::models::StickerPack;
use std::fmt;
use std::io;
use std::path::PathBuf;
use sticker_assets::AssetError;

/// Stable code of a failed validation rule.
///
/// The string tag of a sticker-level code is what gets stored in the sticker's validity
/// column, so the tags must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    InvalidIdentifier,
    DuplicateIdentifier,
    InvalidPublisher,
    InvalidPackName,
    InvalidCharacters,
    DoubleDot,
    InvalidPackSize,
    InvalidThumbnail,
    ThumbnailNotFound,
    ThumbnailFileSize,
    ThumbnailDimensions,
    InvalidAndroidUrl,
    InvalidIosUrl,
    InvalidWebsite,
    InvalidEmail,
    InvalidStickerPath,
    StickerFileNotExist,
    FileSize,
    FileType,
    StickerDimensions,
    StickerType,
    StickerDuration,
    InvalidAccessibility,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::InvalidIdentifier => "INVALID_IDENTIFIER",
            ValidationCode::DuplicateIdentifier => "DUPLICATE_IDENTIFIER",
            ValidationCode::InvalidPublisher => "INVALID_PUBLISHER",
            ValidationCode::InvalidPackName => "INVALID_STICKERPACK_NAME",
            ValidationCode::InvalidCharacters => "INVALID_CHARACTERS",
            ValidationCode::DoubleDot => "CONTAINS_DOUBLE_DOT",
            ValidationCode::InvalidPackSize => "INVALID_STICKERPACK_SIZE",
            ValidationCode::InvalidThumbnail => "INVALID_THUMBNAIL",
            ValidationCode::ThumbnailNotFound => "THUMBNAIL_NOT_FOUND",
            ValidationCode::ThumbnailFileSize => "THUMBNAIL_FILE_SIZE",
            ValidationCode::ThumbnailDimensions => "THUMBNAIL_DIMENSIONS",
            ValidationCode::InvalidAndroidUrl => "INVALID_ANDROID_URL_SITE",
            ValidationCode::InvalidIosUrl => "INVALID_IOS_URL_SITE",
            ValidationCode::InvalidWebsite => "INVALID_WEBSITE",
            ValidationCode::InvalidEmail => "INVALID_EMAIL",
            ValidationCode::InvalidStickerPath => "INVALID_STICKER_PATH",
            ValidationCode::StickerFileNotExist => "STICKER_FILE_NOT_EXIST",
            ValidationCode::FileSize => "ERROR_FILE_SIZE",
            ValidationCode::FileType => "ERROR_FILE_TYPE",
            ValidationCode::StickerDimensions => "ERROR_SIZE_STICKER",
            ValidationCode::StickerType => "ERROR_STICKER_TYPE",
            ValidationCode::StickerDuration => "ERROR_STICKER_DURATION",
            ValidationCode::InvalidAccessibility => "INVALID_STICKER_ACCESSIBILITY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        const ALL: [ValidationCode; 23] = [
            ValidationCode::InvalidIdentifier,
            ValidationCode::DuplicateIdentifier,
            ValidationCode::InvalidPublisher,
            ValidationCode::InvalidPackName,
            ValidationCode::InvalidCharacters,
            ValidationCode::DoubleDot,
            ValidationCode::InvalidPackSize,
            ValidationCode::InvalidThumbnail,
            ValidationCode::ThumbnailNotFound,
            ValidationCode::ThumbnailFileSize,
            ValidationCode::ThumbnailDimensions,
            ValidationCode::InvalidAndroidUrl,
            ValidationCode::InvalidIosUrl,
            ValidationCode::InvalidWebsite,
            ValidationCode::InvalidEmail,
            ValidationCode::InvalidStickerPath,
            ValidationCode::StickerFileNotExist,
            ValidationCode::FileSize,
            ValidationCode::FileType,
            ValidationCode::StickerDimensions,
            ValidationCode::StickerType,
            ValidationCode::StickerDuration,
            ValidationCode::InvalidAccessibility,
        ];
        ALL.into_iter().find(|code| code.as_str() == s)
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed validation rule for a pack, or for one sticker of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: ValidationCode,
    pub pack_identifier: String,
    pub file_name: Option<String>,
    pub message: String,
    /// Limit and measured value for size and dimension rules.
    pub expected: Option<u64>,
    pub actual: Option<u64>,
}

impl ValidationError {
    pub fn new(code: ValidationCode, pack_identifier: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            pack_identifier: pack_identifier.to_string(),
            file_name: None,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn with_file(mut self, file_name: &str) -> Self {
        self.file_name = Some(file_name.to_string());
        self
    }

    pub fn with_values(mut self, expected: u64, actual: u64) -> Self {
        self.expected = Some(expected);
        self.actual = Some(actual);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] pack '{}'", self.code, self.pack_identifier)?;
        if let Some(file) = &self.file_name {
            write!(f, ", file '{}'", file)?;
        }
        write!(f, ": {}", self.message)?;
        if let (Some(expected), Some(actual)) = (self.expected, self.actual) {
            write!(f, " (expected {}, got {})", expected, actual)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Malformed content URIs and requests the content server refuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    UnknownUri(String),
    WrongAuthority { uri: String, expected: String },
    PathSegments { uri: String, expected: usize, actual: usize },
    EmptySegment(String),
    PackDirectoryMissing(String),
    PackNotRegistered(String),
    AssetMissing(String),
    NotWebp(String),
    ReadOnly(&'static str),
    AuthorityPrefix { authority: String, package_name: String },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContractViolation::UnknownUri(uri) => write!(f, "Unknown URI: {}", uri),
            ContractViolation::WrongAuthority { uri, expected } => {
                write!(f, "URI {} does not belong to authority {}", uri, expected)
            }
            ContractViolation::PathSegments {
                uri,
                expected,
                actual,
            } => write!(
                f,
                "Path segments should be {}, but got {}: {}",
                expected, actual, uri
            ),
            ContractViolation::EmptySegment(uri) => {
                write!(f, "Identifier and file name must not be empty: {}", uri)
            }
            ContractViolation::PackDirectoryMissing(id) => {
                write!(f, "Sticker pack directory not found: {}", id)
            }
            ContractViolation::PackNotRegistered(id) => {
                write!(f, "No metadata stored for sticker pack: {}", id)
            }
            ContractViolation::AssetMissing(path) => write!(f, "Asset file not found: {}", path),
            ContractViolation::NotWebp(file) => write!(f, "Sticker file is not WebP: {}", file),
            ContractViolation::ReadOnly(op) => write!(f, "Operation not supported: {}", op),
            ContractViolation::AuthorityPrefix {
                authority,
                package_name,
            } => write!(
                f,
                "Authority '{}' must start with package name '{}'",
                authority, package_name
            ),
        }
    }
}

/// Central error type carried by `Outcome::Failure`
#[derive(Debug)]
pub enum StickerError {
    /// A pack or sticker broke a validation rule
    Validation(ValidationError),
    /// Directory or file operation failed
    Storage(sticker_assets::AssetError),
    /// Database error (rusqlite)
    Persistence(rusqlite::Error),
    /// Malformed URI, unknown route or refused request
    ContentContract(ContractViolation),
    /// Media could not be decoded or encoded
    Encoding(String),
    /// Configuration could not be loaded
    Config(String),
    /// A background task panicked or was cancelled
    Task(String),
    /// A failure that carries the pack it happened on, for repair flows
    WithPack {
        error: Box<StickerError>,
        pack: Box<StickerPack>,
    },
}

impl StickerError {
    /// Wraps an I/O failure on `path` as a storage error.
    pub fn from_io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> StickerError {
        let io_error = AssetError::io(path);
        move |source| StickerError::Storage(io_error(source))
    }

    pub fn with_pack(self, pack: StickerPack) -> Self {
        match self {
            StickerError::WithPack { error, .. } => StickerError::WithPack {
                error,
                pack: Box::new(pack),
            },
            error => StickerError::WithPack {
                error: Box::new(error),
                pack: Box::new(pack),
            },
        }
    }

    /// The pack attached with [`StickerError::with_pack`], if any.
    pub fn pack(&self) -> Option<&StickerPack> {
        match self {
            StickerError::WithPack { pack, .. } => Some(pack),
            _ => None,
        }
    }

    /// The error without an attached pack.
    pub fn inner(&self) -> &StickerError {
        match self {
            StickerError::WithPack { error, .. } => error.inner(),
            other => other,
        }
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self.inner() {
            StickerError::Validation(e) => Some(e),
            _ => None,
        }
    }

    pub fn contract(&self) -> Option<&ContractViolation> {
        match self.inner() {
            StickerError::ContentContract(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for StickerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StickerError::Validation(e) => write!(f, "Validation error: {}", e),
            StickerError::Storage(e) => write!(f, "Storage error: {}", e),
            StickerError::Persistence(e) => write!(f, "Database error: {}", e),
            StickerError::ContentContract(v) => write!(f, "Content contract error: {}", v),
            StickerError::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            StickerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            StickerError::Task(msg) => write!(f, "Background task error: {}", msg),
            StickerError::WithPack { error, pack } => {
                write!(f, "{} (pack '{}')", error, pack.identifier)
            }
        }
    }
}

impl std::error::Error for StickerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StickerError::Validation(e) => Some(e),
            StickerError::Storage(e) => Some(e),
            StickerError::Persistence(e) => Some(e),
            StickerError::WithPack { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<ValidationError> for StickerError {
    fn from(e: ValidationError) -> Self {
        StickerError::Validation(e)
    }
}

impl From<sticker_assets::AssetError> for StickerError {
    fn from(e: sticker_assets::AssetError) -> Self {
        StickerError::Storage(e)
    }
}

impl From<rusqlite::Error> for StickerError {
    fn from(e: rusqlite::Error) -> Self {
        StickerError::Persistence(e)
    }
}

impl From<tokio::task::JoinError> for StickerError {
    fn from(e: tokio::task::JoinError) -> Self {
        StickerError::Task(e.to_string())
    }
}

impl From<ContractViolation> for StickerError {
    fn from(v: ContractViolation) -> Self {
        StickerError::ContentContract(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_tags_round_trip() {
        for tag in ["ERROR_SIZE_STICKER", "INVALID_EMAIL", "THUMBNAIL_NOT_FOUND"] {
            assert_eq!(ValidationCode::from_str(tag).unwrap().as_str(), tag);
        }
        assert_eq!(ValidationCode::from_str("bogus"), None);
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(ValidationCode::StickerDimensions, "abc", "wrong width")
            .with_file("a.webp")
            .with_values(512, 256);
        assert_eq!(
            err.to_string(),
            "[ERROR_SIZE_STICKER] pack 'abc', file 'a.webp': wrong width (expected 512, got 256)"
        );
    }

    #[test]
    fn test_with_pack_keeps_inner_error() {
        let pack = StickerPack::new("abc", "Demo", "Me");
        let err = StickerError::from(ValidationError::new(
            ValidationCode::FileType,
            "abc",
            "not webp",
        ))
        .with_pack(pack.clone())
        .with_pack(pack);

        assert_eq!(err.pack().unwrap().identifier, "abc");
        assert_eq!(err.validation().unwrap().code, ValidationCode::FileType);
        assert!(matches!(err, StickerError::WithPack { ref error, .. } if error.pack().is_none()));
    }
}
