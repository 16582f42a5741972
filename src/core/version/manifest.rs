// ─── Version Manifest ───
// Per-version document: main class, asset index, libraries, client jar,
// logging config and launch arguments. Cached verbatim on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::index::VersionIndex;
use super::rules::Rule;
use crate::core::artifact::{Artifact, ContentHash};
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub id: String,
    #[serde(rename = "type", default = "default_version_type")]
    pub version_type: String,
    #[serde(default)]
    pub main_class: Option<String>,
    pub asset_index: AssetIndexInfo,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryDescriptor>,
    #[serde(default)]
    pub downloads: VersionDownloads,
    #[serde(default)]
    pub logging: Option<LoggingInfo>,
    #[serde(default)]
    pub minimum_launcher_version: Option<u32>,
    /// Legacy template string (pre-1.13 manifests).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
}

fn default_version_type() -> String {
    "release".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<DownloadInfo>,
    #[serde(default)]
    pub server: Option<DownloadInfo>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DownloadInfo {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

impl DownloadInfo {
    pub fn content_hash(&self) -> Option<ContentHash> {
        self.sha1.clone().map(ContentHash::Sha1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingInfo {
    #[serde(default)]
    pub client: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// JVM argument template, e.g. `-Dlog4j.configurationFile=${path}`.
    pub argument: String,
    pub file: LoggingFile,
    #[serde(rename = "type", default)]
    pub config_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingFile {
    pub id: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentValue>,
    #[serde(default)]
    pub jvm: Vec<ArgumentValue>,
}

/// Modern argument entry: a bare string or a rule-guarded value.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ArgumentValue {
    Plain(String),
    Conditional {
        rules: Vec<Rule>,
        value: StringOrList,
    },
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn values(&self) -> Vec<String> {
        match self {
            StringOrList::One(v) => vec![v.clone()],
            StringOrList::Many(v) => v.clone(),
        }
    }
}

// ─── Library descriptors ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDescriptor {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    /// OS name → classifier, possibly containing `${arch}`.
    #[serde(default)]
    pub natives: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub extract: Option<ExtractRules>,
    /// Repository base for libraries without explicit downloads.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<DownloadInfo>,
    #[serde(default)]
    pub classifiers: Option<BTreeMap<String, DownloadInfo>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl VersionManifest {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        serde_json::from_str(raw).map_err(|e| LauncherError::Manifest(format!("invalid manifest: {e}")))
    }

    pub fn client_jar_path(&self, versions_dir: &Path) -> PathBuf {
        versions_dir.join(&self.id).join(format!("{}.jar", self.id))
    }

    /// Client jar and logging configuration: the `files` category.
    pub fn misc_files(&self, versions_dir: &Path, assets_dir: &Path) -> Vec<Artifact> {
        let mut files = Vec::new();
        if let Some(client) = &self.downloads.client {
            files.push(Artifact::new(
                format!("{}.jar", self.id),
                client.content_hash(),
                client.size,
                client.url.clone(),
                self.client_jar_path(versions_dir),
            ));
        }
        if let Some(logging) = self.logging.as_ref().and_then(|l| l.client.as_ref()) {
            files.push(Artifact::new(
                logging.file.id.clone(),
                logging.file.sha1.clone().map(ContentHash::Sha1),
                logging.file.size,
                logging.file.url.clone(),
                logging_config_path(assets_dir, &logging.file.id),
            ));
        }
        files
    }
}

pub fn logging_config_path(assets_dir: &Path, file_id: &str) -> PathBuf {
    assets_dir.join("log_configs").join(file_id)
}

/// Loads version manifests, caching each under `versions/<id>/<id>.json`.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    downloader: Downloader,
    versions_dir: PathBuf,
    index_url: String,
    allow_prerelease: bool,
}

impl ManifestLoader {
    pub fn new(downloader: Downloader, versions_dir: PathBuf, allow_prerelease: bool) -> Self {
        Self {
            downloader,
            versions_dir,
            index_url: super::index::VERSION_INDEX_URL.to_string(),
            allow_prerelease,
        }
    }

    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    pub fn manifest_path(&self, version_id: &str) -> PathBuf {
        self.versions_dir
            .join(version_id)
            .join(format!("{version_id}.json"))
    }

    /// Return the parsed manifest, fetching it when there is no cached copy
    /// or `force` is set. Once a fetch is attempted there is no fallback to
    /// the cached file.
    #[instrument(skip(self))]
    pub async fn load(&self, version_id: &str, force: bool) -> LauncherResult<VersionManifest> {
        let path = self.manifest_path(version_id);

        if !force && path.is_file() {
            debug!("Using cached manifest {:?}", path);
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| LauncherError::io(&path, e))?;
            return VersionManifest::parse(&raw);
        }

        let index = VersionIndex::fetch(&self.downloader, &self.index_url).await?;
        let entry = index.find_version(version_id).ok_or_else(|| {
            LauncherError::Manifest(format!("Version {version_id} is not in the version index"))
        })?;
        if !entry.is_release() && !self.allow_prerelease {
            return Err(LauncherError::Manifest(format!(
                "{version_id} is a {} version and prerelease versions are disabled",
                entry.version_type
            )));
        }

        info!("Fetching manifest for {} from {}", version_id, entry.url);
        let raw = self
            .downloader
            .fetch_text(&entry.url)
            .await
            .map_err(|e| LauncherError::Manifest(format!("{version_id}: {e}")))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(&path, &raw)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;

        VersionManifest::parse(&raw)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const LEGACY_MANIFEST: &str = r#"{
        "id": "1.12.2",
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "minimumLauncherVersion": 18,
        "assetIndex": {"id": "1.12", "url": "https://launchermeta.mojang.com/1.12.json", "sha1": "1584b57", "size": 169, "totalSize": 127},
        "assets": "1.12",
        "minecraftArguments": "--username ${auth_player_name} --version ${version_name} --gameDir ${game_directory} --assetsDir ${assets_root} --assetIndex ${assets_index_name} --uuid ${auth_uuid} --accessToken ${auth_access_token} --userType ${user_type} --versionType ${version_type}",
        "downloads": {
            "client": {"sha1": "0f275bc1547d01fa5f56ba34bdc87d981ee12daf", "size": 10180113, "url": "https://launcher.mojang.com/client.jar"}
        },
        "logging": {
            "client": {
                "argument": "-Dlog4j.configurationFile=${path}",
                "file": {"id": "client-1.12.xml", "sha1": "ef4f57b922df243d0cef096efe808c72db042149", "size": 877, "url": "https://launcher.mojang.com/client-1.12.xml"},
                "type": "log4j2-xml"
            }
        },
        "libraries": [
            {
                "name": "com.mojang:patchy:1.1",
                "downloads": {"artifact": {"path": "com/mojang/patchy/1.1/patchy-1.1.jar", "sha1": "aef610b34a1be37fa851825f12372b78424d8903", "size": 15817, "url": "https://libraries.minecraft.net/com/mojang/patchy/1.1/patchy-1.1.jar"}}
            },
            {
                "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4-nightly-20150209",
                "natives": {"linux": "natives-linux", "osx": "natives-osx", "windows": "natives-windows"},
                "extract": {"exclude": ["META-INF/"]},
                "downloads": {
                    "classifiers": {
                        "natives-linux": {"path": "org/lwjgl/lwjgl/lwjgl-platform/2.9.4-nightly-20150209/lwjgl-platform-2.9.4-nightly-20150209-natives-linux.jar", "sha1": "931074f46c795d2f7b30ed6395df5715cfd7675b", "size": 578680, "url": "https://libraries.minecraft.net/lwjgl-platform-natives-linux.jar"},
                        "natives-osx": {"path": "org/lwjgl/lwjgl/lwjgl-platform/2.9.4-nightly-20150209/lwjgl-platform-2.9.4-nightly-20150209-natives-osx.jar", "sha1": "bcab850f8f487c3f4c4dbabde778bb82bd1a40ed", "size": 426822, "url": "https://libraries.minecraft.net/lwjgl-platform-natives-osx.jar"},
                        "natives-windows": {"path": "org/lwjgl/lwjgl/lwjgl-platform/2.9.4-nightly-20150209/lwjgl-platform-2.9.4-nightly-20150209-natives-windows.jar", "sha1": "b84d5102b9dbfabfeb5e43c7e2828d98a7fc80e0", "size": 613748, "url": "https://libraries.minecraft.net/lwjgl-platform-natives-windows.jar"}
                    }
                }
            },
            {
                "name": "ca.weblite:java-objc-bridge:1.0.0",
                "rules": [{"action": "allow", "os": {"name": "osx"}}],
                "downloads": {"artifact": {"path": "ca/weblite/java-objc-bridge/1.0.0/java-objc-bridge-1.0.0.jar", "sha1": "6ef160c3133a78de015830860197602ca1c855d3", "size": 40502, "url": "https://libraries.minecraft.net/java-objc-bridge-1.0.0.jar"}}
            }
        ]
    }"#;
}
