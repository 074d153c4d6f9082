use serde::{Deserialize, Serialize};

/// Persisted reference to an image that was lifted out of a post body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    /// 1-based position in document order.
    pub position: u32,
    /// Path written into the markup in place of the original reference.
    pub placeholder: String,
    pub extension: String,
    /// Original reference for remote images; `None` for inline data URIs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

/// Outcome of writing the extracted assets of one post to the blob store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReport {
    pub stored: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub skipped: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed: Vec<AssetFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFailure {
    pub path: String,
    pub reason: String,
}

impl AssetReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}
