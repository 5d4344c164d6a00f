use chrono::{DateTime, Utc};
use selfupdate_utils::{Version, VersionError};
use serde::{Deserialize, Serialize};

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub size: u64,
    pub download_url: String,
}

/// Provider-independent view of a published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub tag_name: String,
    pub page_url: String,
    pub notes: String,
    pub published_at: Option<DateTime<Utc>>,
    pub assets: Vec<Asset>,
}

impl Release {
    /// Version derived from the tag, never from the display name.
    pub fn version(&self) -> Result<Version, VersionError> {
        Version::parse(&self.tag_name)
    }

    /// Exact, case-sensitive lookup by asset name.
    pub fn find_asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

/// Display name with the tag as fallback for untitled releases.
pub(crate) fn display_name(name: Option<String>, tag_name: &str) -> String {
    name.filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| tag_name.to_string())
}
