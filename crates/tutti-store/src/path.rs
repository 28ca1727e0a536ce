//! Record path parsing.
//!
//! A document lives at `/{collection}/{id}`, where the collection may itself
//! contain slashes (`/system/errors/rec-1a2b3c4d`). The final segment is
//! always the ID.

use crate::error::StoreError;

/// A parsed document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    pub collection: String,
    pub id: String,
}

impl DocPath {
    /// Parse `/{collection}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if either part is missing or any
    /// segment is empty.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let (collection, id) = trimmed
            .rsplit_once('/')
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        if id.is_empty() || collection.split('/').any(str::is_empty) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(Self {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    #[must_use]
    pub fn new(collection: &str, id: &str) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.collection, self.id)
    }
}

/// Parse a collection path used as a `post` target.
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for an empty path or empty segments.
pub fn parse_collection(path: &str) -> Result<String, StoreError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(str::is_empty) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_path() {
        let p = DocPath::parse("/theory/thr-01").unwrap();
        assert_eq!(p.collection, "theory");
        assert_eq!(p.id, "thr-01");
        assert_eq!(p.to_string(), "/theory/thr-01");
    }

    #[test]
    fn nested_collection_keeps_last_segment_as_id() {
        let p = DocPath::parse("/system/errors/rec-00000001").unwrap();
        assert_eq!(p.collection, "system/errors");
        assert_eq!(p.id, "rec-00000001");
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "/", "/theory", "/theory/", "//thr-01", "/a//b"] {
            assert!(
                matches!(DocPath::parse(bad), Err(StoreError::InvalidPath(_))),
                "should reject {bad:?}"
            );
        }
    }

    #[test]
    fn collection_paths() {
        assert_eq!(parse_collection("/system/errors").unwrap(), "system/errors");
        assert_eq!(parse_collection("/theory/").unwrap(), "theory");
        assert!(parse_collection("/").is_err());
    }
}
