use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::core::artifact::{collect_invalid, Artifact, ContentHash, Queue, VALIDATION_FANOUT};
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent, ProgressKind};
use crate::core::version::AssetIndexInfo;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Asset index document: logical name → content-addressed object.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

/// Expands an asset index into artifacts and enqueues the ones missing locally.
#[derive(Debug, Clone)]
pub struct AssetIndexResolver {
    downloader: Downloader,
    assets_dir: PathBuf,
    resources_url: String,
    fanout: usize,
}

impl AssetIndexResolver {
    pub fn new(downloader: Downloader, assets_dir: PathBuf) -> Self {
        Self {
            downloader,
            assets_dir,
            resources_url: RESOURCES_URL.to_string(),
            fanout: VALIDATION_FANOUT,
        }
    }

    pub fn with_resources_url(mut self, url: impl Into<String>) -> Self {
        self.resources_url = url.into();
        self
    }

    pub fn index_path(&self, index_id: &str) -> PathBuf {
        self.assets_dir
            .join("indexes")
            .join(format!("{index_id}.json"))
    }

    /// Read the cached index, or fetch and persist it when absent or stale.
    pub async fn load_index(&self, info: &AssetIndexInfo, force: bool) -> LauncherResult<AssetIndex> {
        let path = self.index_path(&info.id);
        let cached_ok = path.is_file() && !force && self.cached_index_valid(info, &path).await;

        let raw = if cached_ok {
            debug!("Using cached asset index {:?}", path);
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| LauncherError::io(&path, e))?
        } else {
            info!("Fetching asset index {} from {}", info.id, info.url);
            let raw = self
                .downloader
                .fetch_text(&info.url)
                .await
                .map_err(|e| LauncherError::Manifest(format!("asset index {}: {e}", info.id)))?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LauncherError::io(parent, e))?;
            }
            tokio::fs::write(&path, &raw)
                .await
                .map_err(|e| LauncherError::io(&path, e))?;
            raw
        };

        serde_json::from_str(&raw)
            .map_err(|e| LauncherError::Manifest(format!("asset index {}: {e}", info.id)))
    }

    async fn cached_index_valid(&self, info: &AssetIndexInfo, path: &Path) -> bool {
        let Some(sha1) = info.sha1.clone() else {
            return true;
        };
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || ContentHash::Sha1(sha1).matches(&path))
            .await
            .unwrap_or(false)
    }

    /// Build one artifact per index object, stored at `objects/<2 hex>/<hash>`.
    pub fn artifacts(&self, index: &AssetIndex) -> Vec<Artifact> {
        let objects_dir = self.assets_dir.join("objects");
        let base = self.resources_url.trim_end_matches('/');
        index
            .objects
            .iter()
            .filter_map(|(name, object)| {
                let Some(prefix) = object.hash.get(..2) else {
                    warn!("Skipping asset {} with malformed hash {:?}", name, object.hash);
                    return None;
                };
                Some(Artifact::new(
                    name.clone(),
                    Some(ContentHash::Sha1(object.hash.clone())),
                    object.size,
                    format!("{base}/{prefix}/{}", object.hash),
                    objects_dir.join(prefix).join(&object.hash),
                ))
            })
            .collect()
    }

    /// Validate every asset locally and push mismatches into `queue`.
    /// Returns the number enqueued.
    #[instrument(skip_all, fields(index = %info.id))]
    pub async fn resolve(
        &self,
        info: &AssetIndexInfo,
        force: bool,
        queue: &mut Queue,
        events: &EventSink,
    ) -> LauncherResult<usize> {
        let index = self.load_index(info, force).await?;
        let artifacts = self.artifacts(&index);
        let total = artifacts.len() as u64;

        let invalid = collect_invalid(artifacts, self.fanout, |checked| {
            events.emit(LauncherEvent::progress(
                ProgressKind::Assets,
                checked as u64,
                total,
            ));
        })
        .await;

        let enqueued = invalid.len();
        for artifact in invalid {
            queue.push(artifact);
        }
        info!(
            "Asset index {}: {} objects, {} need download",
            info.id, total, enqueued
        );
        Ok(enqueued)
    }
}
