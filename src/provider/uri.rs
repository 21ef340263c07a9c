use crate::error::ContractViolation;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sticker_assets::{STICKERS_ASSET, THUMBNAIL_FILE};
use url::Url;

pub const METADATA: &str = "metadata";
pub const STICKERS: &str = "stickers";

/// Characters left unescaped inside a single path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A matched content URI.
///
/// The numeric codes are part of the external contract and must not be renumbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    AllPacks,
    Pack(String),
    Stickers(String),
    StickerAsset { pack: String, file: String },
    TrayIcon { pack: String, file: String },
}

impl Route {
    pub fn code(&self) -> u32 {
        match self {
            Route::AllPacks => 1,
            Route::Pack(_) => 2,
            Route::Stickers(_) => 3,
            Route::StickerAsset { .. } => 4,
            Route::TrayIcon { .. } => 5,
        }
    }
}

/// Matches `content://<authority>/...` URIs against the fixed route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    authority: String,
}

impl RouteTable {
    pub fn new(authority: &str) -> Self {
        Self {
            authority: authority.to_string(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn match_uri(&self, uri: &str) -> Result<Route, ContractViolation> {
        let unknown = || ContractViolation::UnknownUri(uri.to_string());

        let parsed = Url::parse(uri).map_err(|_| unknown())?;
        if parsed.scheme() != "content" {
            return Err(unknown());
        }
        if parsed.host_str() != Some(self.authority.as_str()) {
            return Err(ContractViolation::WrongAuthority {
                uri: uri.to_string(),
                expected: self.authority.clone(),
            });
        }

        let mut segments = Vec::new();
        for raw in parsed.path_segments().into_iter().flatten() {
            if raw.is_empty() {
                continue;
            }
            let decoded = percent_decode_str(raw).decode_utf8().map_err(|_| unknown())?;
            segments.push(decoded.into_owned());
        }

        let route = match segments.as_slice() {
            [root] if root == METADATA => Route::AllPacks,
            [root, id] if root == METADATA => Route::Pack(non_blank(id, uri)?),
            [root, id] if root == STICKERS => Route::Stickers(non_blank(id, uri)?),
            [root, id, file] if root == STICKERS_ASSET => {
                let pack = non_blank(id, uri)?;
                let file = non_blank(file, uri)?;
                if file == THUMBNAIL_FILE {
                    Route::TrayIcon { pack, file }
                } else {
                    Route::StickerAsset { pack, file }
                }
            }
            [root, ..] if root == STICKERS_ASSET => {
                return Err(ContractViolation::PathSegments {
                    uri: uri.to_string(),
                    expected: 3,
                    actual: segments.len(),
                })
            }
            _ => return Err(unknown()),
        };
        Ok(route)
    }

    pub fn metadata_uri(&self) -> String {
        format!("content://{}/{}", self.authority, METADATA)
    }

    pub fn pack_uri(&self, pack_identifier: &str) -> String {
        format!("{}/{}", self.metadata_uri(), encode(pack_identifier))
    }

    pub fn stickers_uri(&self, pack_identifier: &str) -> String {
        format!("content://{}/{}/{}", self.authority, STICKERS, encode(pack_identifier))
    }

    pub fn sticker_asset_uri(&self, pack_identifier: &str, file_name: &str) -> String {
        format!(
            "content://{}/{}/{}/{}",
            self.authority,
            STICKERS_ASSET,
            encode(pack_identifier),
            encode(file_name)
        )
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn non_blank(segment: &str, uri: &str) -> Result<String, ContractViolation> {
    if segment.trim().is_empty() {
        return Err(ContractViolation::EmptySegment(uri.to_string()));
    }
    Ok(segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHORITY: &str = "com.example.stickers.stickercontentprovider";

    fn table() -> RouteTable {
        RouteTable::new(AUTHORITY)
    }

    #[test]
    fn test_route_codes() {
        let t = table();
        let cases = [
            (t.metadata_uri(), 1),
            (t.pack_uri("abc"), 2),
            (t.stickers_uri("abc"), 3),
            (t.sticker_asset_uri("abc", "one.webp"), 4),
            (t.sticker_asset_uri("abc", "thumbnail.jpg"), 5),
        ];
        for (uri, code) in cases {
            assert_eq!(t.match_uri(&uri).unwrap().code(), code, "{}", uri);
        }
    }

    #[test]
    fn test_segments_are_decoded() {
        let t = table();
        let uri = t.sticker_asset_uri("My Pack's", "smile face.webp");
        assert!(uri.contains("My%20Pack%27s"));
        assert_eq!(
            t.match_uri(&uri).unwrap(),
            Route::StickerAsset {
                pack: "My Pack's".to_string(),
                file: "smile face.webp".to_string()
            }
        );
    }

    #[test]
    fn test_two_segment_asset_uri_is_rejected_with_uri() {
        let uri = format!("content://{}/stickers_asset/abc", AUTHORITY);
        match table().match_uri(&uri).unwrap_err() {
            ContractViolation::PathSegments {
                uri: echoed,
                expected,
                actual,
            } => {
                assert_eq!(echoed, uri);
                assert_eq!((expected, actual), (3, 2));
            }
            other => panic!("unexpected {:?}", other),
        }

        // An empty segment collapses and is counted as missing
        let uri = format!("content://{}/stickers_asset//one.webp", AUTHORITY);
        assert!(matches!(
            table().match_uri(&uri),
            Err(ContractViolation::PathSegments { actual: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_and_foreign_uris() {
        let t = table();
        for uri in [
            format!("content://{}/nothing", AUTHORITY),
            format!("content://{}/metadata/a/b", AUTHORITY),
            format!("https://{}/metadata", AUTHORITY),
            "not a uri".to_string(),
        ] {
            assert!(matches!(t.match_uri(&uri), Err(ContractViolation::UnknownUri(_))), "{}", uri);
        }
        assert!(matches!(
            t.match_uri("content://other.authority/metadata"),
            Err(ContractViolation::WrongAuthority { .. })
        ));
        assert!(matches!(
            t.match_uri(&format!("content://{}/stickers/%20", AUTHORITY)),
            Err(ContractViolation::EmptySegment(_))
        ));
    }
}
