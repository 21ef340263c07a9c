use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error type for asset storage operations
#[derive(Debug)]
pub enum AssetError {
    Io { path: PathBuf, source: io::Error },
    NotFound(PathBuf),
    InvalidName(String),
    ImageDecode(String),
    ImageEncode(String),
    MalformedWebp(String),
}

impl AssetError {
    /// Adapter for `map_err` that keeps the path the I/O call was made on.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> AssetError {
        let path = path.into();
        move |source| AssetError::Io { path, source }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            AssetError::NotFound(_) => true,
            AssetError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Io { path, source } => write!(f, "IO error on {}: {}", path.display(), source),
            AssetError::NotFound(path) => write!(f, "File not found: {}", path.display()),
            AssetError::InvalidName(name) => write!(f, "Invalid asset name: {:?}", name),
            AssetError::ImageDecode(msg) => write!(f, "Image decode error: {}", msg),
            AssetError::ImageEncode(msg) => write!(f, "Image encode error: {}", msg),
            AssetError::MalformedWebp(msg) => write!(f, "Malformed WebP: {}", msg),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(AssetError::NotFound(PathBuf::from("/x")).is_not_found());

        let err = AssetError::io("/x")(io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = AssetError::io("/x")(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("/x"));
    }
}
