// ─── Version Index ───
// The global list of published versions (version_manifest_v2.json).

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};

pub const VERSION_INDEX_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Clone, Deserialize)]
pub struct VersionIndex {
    #[serde(default)]
    pub latest: Option<LatestVersions>,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionEntry {
    pub fn is_release(&self) -> bool {
        self.version_type == "release"
    }
}

impl VersionIndex {
    pub async fn fetch(downloader: &Downloader, url: &str) -> LauncherResult<Self> {
        info!("Fetching version index from {}", url);
        let index: VersionIndex = downloader
            .fetch_json(url)
            .await
            .map_err(|e| LauncherError::Manifest(format!("version index: {e}")))?;
        info!("Loaded {} versions from index", index.versions.len());
        Ok(index)
    }

    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn releases(&self) -> Vec<&VersionEntry> {
        self.versions.iter().filter(|v| v.is_release()).collect()
    }

    /// Versions a user may pick. Snapshots and betas only with `allow_prerelease`.
    pub fn selectable(&self, allow_prerelease: bool) -> Vec<&VersionEntry> {
        self.versions
            .iter()
            .filter(|v| allow_prerelease || v.is_release())
            .collect()
    }
}
