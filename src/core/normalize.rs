use crate::types::{ReconError, ReconResult, SceneIdentity};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

/// Which naming scheme produced an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdHint {
    /// Catalog id of a raw acquisition or scene-pair reference
    Catalog,
    /// Catalog id of a localized scene
    Localized,
    /// Filename-like string with no catalog id
    Filename,
}

/// Fixed-width date+time token embedded in Sentinel-1 filenames
/// (8-digit date, literal T, 6-digit time)
fn timestamp_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"([1-2][0-9]{7}T[0-9]{6})").expect("timestamp pattern"))
}

/// Canonicalizes a product identifier into a scene identity.
///
/// Localization markers are stripped so a raw acquisition id and its
/// localized counterpart normalize identically. When only a filename-like
/// string is available, the embedded timestamp token is parsed and returned
/// at second precision as a fallback identity.
pub fn scene_identity(raw: &str, hint: IdHint) -> ReconResult<SceneIdentity> {
    let stripped = strip_local_markers(raw.trim());

    if hint == IdHint::Filename {
        if let Some(identity) = embedded_timestamp(raw) {
            return Ok(identity);
        }
    }
    if !stripped.is_empty() {
        return Ok(stripped);
    }
    if let Some(identity) = embedded_timestamp(raw) {
        return Ok(identity);
    }
    Err(ReconError::IdentityNotFound(raw.to_string()))
}

/// Removes every occurrence of the localization markers.
/// The longer marker goes first so `-localized` does not leave `ized` behind.
fn strip_local_markers(id: &str) -> String {
    id.replace("-localized", "").replace("-local", "")
}

/// Extracts and reformats the embedded timestamp token, if any
fn embedded_timestamp(raw: &str) -> Option<String> {
    let token = timestamp_token().find(raw)?.as_str();
    let parsed = NaiveDateTime::parse_from_str(token, "%Y%m%dT%H%M%S").ok()?;
    Some(parsed.format("%Y-%m-%dT%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_marker_stripping() {
        let raw = scene_identity("S1A_IW_SLC_20200103T170815_DADE", IdHint::Catalog).unwrap();
        let local =
            scene_identity("S1A_IW_SLC_20200103T170815_DADE-local", IdHint::Localized).unwrap();
        assert_eq!(raw, local);

        let localized =
            scene_identity("S1A_IW_SLC_20200103T170815_DADE-localized", IdHint::Localized).unwrap();
        assert_eq!(raw, localized);
    }

    #[test]
    fn test_filename_timestamp_fallback() {
        let identity = scene_identity(
            "S1A_IW_SLC__1SDV_20200103T170815_20200103T170842_030639_0382D5_DADE.zip",
            IdHint::Filename,
        )
        .unwrap();
        assert_eq!(identity, "2020-01-03T17:08:15");
    }

    #[test]
    fn test_identity_not_found() {
        let result = scene_identity("", IdHint::Catalog);
        assert!(matches!(result, Err(ReconError::IdentityNotFound(_))));
    }
}
