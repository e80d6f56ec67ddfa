use serde::{Deserialize, Serialize};

use crate::storage::uploads::PUBLIC_PREFIX;

/// A stored reference to a file served from the upload mount.
///
/// `url` is always relative to the static-asset root (e.g. `uploads/images/<id>.png`)
/// and must be resolved before a browser can load it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AssetRef {
    pub fn new(url: impl Into<String>) -> Self {
        AssetRef { url: url.into(), name: None }
    }

    pub fn named(url: impl Into<String>, name: impl Into<String>) -> Self {
        AssetRef { url: url.into(), name: Some(name.into()) }
    }

    pub fn is_blank(&self) -> bool {
        self.url.trim().is_empty()
    }
}

/// Normalises a submitted reference to the stored form `uploads/...`.
///
/// Absolute URLs, `data:` URIs, parent segments and anything outside the
/// upload mount are refused. One leading `/` is tolerated.
pub fn stored_path(reference: &str) -> Option<String> {
    let reference = reference.trim();
    let path = reference.strip_prefix('/').unwrap_or(reference);

    let mut segments = path.split('/');
    if segments.next() != Some(PUBLIC_PREFIX) {
        return None;
    }
    let mut rest = 0;
    for segment in segments {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains(['\\', ':']) {
            return None;
        }
        rest += 1;
    }
    (rest > 0).then(|| path.to_string())
}
