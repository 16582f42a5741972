// ─── Java Provisioning ───
// Fetches a Java 8 runtime when discovery comes up empty. The archive goes
// through the `java` download queue; its completion hook verifies,
// extracts and records the executable.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::paths::java_executable_from_root;
use crate::core::archive;
use crate::core::artifact::{Artifact, Category, ContentHash};
use crate::core::downloader::{DownloadOrchestrator, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Platform;

pub const RUNTIME_MAJOR: u32 = 8;
const ADOPTIUM_API_BASE: &str = "https://api.adoptium.net/v3/assets/latest";
const CORRETTO_MAC_URL: &str =
    "https://corretto.aws/downloads/latest/amazon-corretto-8-x64-macos-jdk.tar.gz";
const MIN_FREE_DISK_BYTES: u64 = 512 * 1024 * 1024;

/// A downloadable runtime build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRelease {
    pub url: String,
    pub file_name: String,
    pub size: u64,
    pub hash: Option<ContentHash>,
    pub version: String,
}

#[async_trait]
pub trait RuntimeSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Latest x64 build of the given major version, if the source has one.
    async fn latest(&self, downloader: &Downloader, major: u32) -> LauncherResult<Option<RuntimeRelease>>;
}

// ── Adoptium ────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumRelease {
    binary: AdoptiumBinary,
    version: AdoptiumVersion,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumBinary {
    package: AdoptiumPackage,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumPackage {
    checksum: String,
    link: String,
    name: String,
    size: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumVersion {
    openjdk_version: String,
}

pub struct AdoptiumSource {
    api_base: String,
    platform: Platform,
}

impl AdoptiumSource {
    pub fn new(platform: Platform) -> Self {
        Self {
            api_base: ADOPTIUM_API_BASE.to_string(),
            platform,
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

#[async_trait]
impl RuntimeSource for AdoptiumSource {
    fn name(&self) -> &'static str {
        "adoptium"
    }

    async fn latest(&self, downloader: &Downloader, major: u32) -> LauncherResult<Option<RuntimeRelease>> {
        let url = format!(
            "{}/{}/hotspot?architecture=x64&image_type=jdk&os={}&vendor=eclipse",
            self.api_base.trim_end_matches('/'),
            major,
            self.platform.distribution_name()
        );
        let releases: Vec<AdoptiumRelease> = downloader.fetch_json(&url).await?;
        Ok(releases.into_iter().next().map(|r| RuntimeRelease {
            url: r.binary.package.link,
            file_name: r.binary.package.name,
            size: r.binary.package.size,
            hash: Some(ContentHash::Sha256(r.binary.package.checksum)),
            version: r.version.openjdk_version,
        }))
    }
}

// ── Corretto ────────────────────────────────────────

/// Amazon Corretto, used on macOS where Adoptium lacks Java 8 builds.
pub struct CorrettoSource {
    url: String,
}

impl CorrettoSource {
    pub fn new() -> Self {
        Self {
            url: CORRETTO_MAC_URL.to_string(),
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for CorrettoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuntimeSource for CorrettoSource {
    fn name(&self) -> &'static str {
        "corretto"
    }

    async fn latest(&self, downloader: &Downloader, major: u32) -> LauncherResult<Option<RuntimeRelease>> {
        if major != RUNTIME_MAJOR {
            return Ok(None);
        }
        let response = downloader
            .client()
            .head(&self.url)
            .send()
            .await
            .map_err(|e| LauncherError::Fetch {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Ok(None);
        }
        // Redirects land on the versioned file name.
        let final_url = response.url().to_string();
        let file_name = final_url
            .rsplit('/')
            .next()
            .filter(|n| !n.is_empty())
            .unwrap_or("corretto-8.tar.gz")
            .to_string();
        // `content_length()` describes the (empty) HEAD body, not the file.
        let size = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(Some(RuntimeRelease {
            url: self.url.clone(),
            size,
            file_name,
            hash: None,
            version: "8".to_string(),
        }))
    }
}

pub fn source_for(platform: Platform) -> Arc<dyn RuntimeSource> {
    match platform {
        Platform::MacOs => Arc::new(CorrettoSource::new()),
        Platform::Windows | Platform::Linux => Arc::new(AdoptiumSource::new(platform)),
    }
}

// ── Provisioner ─────────────────────────────────────

/// Receives the executable path once the runtime archive has been extracted.
#[derive(Debug, Clone, Default)]
pub struct ProvisionHandle {
    slot: Arc<Mutex<Option<PathBuf>>>,
}

impl ProvisionHandle {
    pub fn executable(&self) -> Option<PathBuf> {
        self.slot.lock().ok().and_then(|guard| guard.clone())
    }
}

#[derive(Clone)]
pub struct JavaProvisioner {
    source: Arc<dyn RuntimeSource>,
    runtime_dir: PathBuf,
    platform: Platform,
    min_free_bytes: u64,
}

impl JavaProvisioner {
    pub fn new(source: Arc<dyn RuntimeSource>, runtime_dir: PathBuf, platform: Platform) -> Self {
        Self {
            source,
            runtime_dir,
            platform,
            min_free_bytes: MIN_FREE_DISK_BYTES,
        }
    }

    pub fn with_min_free_space(mut self, bytes: u64) -> Self {
        self.min_free_bytes = bytes;
        self
    }

    pub fn for_platform(platform: Platform, runtime_dir: PathBuf) -> Self {
        Self::new(source_for(platform), runtime_dir, platform)
    }

    /// Look up the latest runtime and put it on the `java` queue with an
    /// extraction hook. Nothing is downloaded until the queue is processed.
    #[instrument(skip_all, fields(source = self.source.name()))]
    pub async fn enqueue(&self, orchestrator: &mut DownloadOrchestrator) -> LauncherResult<ProvisionHandle> {
        let release = self
            .source
            .latest(orchestrator.downloader(), RUNTIME_MAJOR)
            .await
            .map_err(|e| LauncherError::Provision(format!("runtime lookup failed: {e}")))?
            .ok_or_else(|| {
                LauncherError::Provision(format!(
                    "{} has no Java {} build for {}",
                    self.source.name(),
                    RUNTIME_MAJOR,
                    self.platform
                ))
            })?;

        tokio::fs::create_dir_all(&self.runtime_dir)
            .await
            .map_err(|e| LauncherError::io(&self.runtime_dir, e))?;
        ensure_min_disk_space(&self.runtime_dir, self.min_free_bytes)?;

        info!("Queueing Java runtime {} from {}", release.version, release.url);
        let archive_path = self.runtime_dir.join(&release.file_name);
        let artifact = Artifact::new(
            release.file_name.clone(),
            release.hash.clone(),
            release.size,
            release.url.clone(),
            archive_path,
        );

        let handle = ProvisionHandle::default();
        let slot = handle.slot.clone();
        let runtime_dir = self.runtime_dir.clone();
        let platform = self.platform;
        orchestrator.set_callback(
            Category::Java,
            Arc::new(move |artifact: &Artifact| {
                let executable = install_runtime_archive(artifact, &runtime_dir, platform)?;
                if let Ok(mut guard) = slot.lock() {
                    *guard = Some(executable);
                }
                Ok(())
            }),
        );
        orchestrator.enqueue(Category::Java, artifact);
        Ok(handle)
    }

    /// Enqueue, download and install a runtime in one go.
    pub async fn provision(&self, orchestrator: &mut DownloadOrchestrator, concurrency: usize) -> LauncherResult<PathBuf> {
        let handle = self.enqueue(orchestrator).await?;
        let report = orchestrator.process(&[(Category::Java, concurrency)]).await;
        if let Some(failure) = report
            .category(Category::Java)
            .and_then(|c| c.failures.first())
        {
            return Err(LauncherError::Provision(format!(
                "{}: {}",
                failure.id, failure.error
            )));
        }
        handle.executable().ok_or_else(|| {
            LauncherError::Provision("runtime archive produced no executable".into())
        })
    }
}

/// Verify, extract and delete a downloaded runtime archive. Returns the
/// executable inside the extracted root.
fn install_runtime_archive(artifact: &Artifact, runtime_dir: &Path, platform: Platform) -> LauncherResult<PathBuf> {
    if let Some(hash) = &artifact.hash {
        hash.verify(&artifact.path)
            .map_err(|e| LauncherError::Provision(e.to_string()))?;
    }

    let summary = if archive::is_tar_gz(&artifact.path) {
        archive::extract_tar_gz(&artifact.path, runtime_dir)
    } else {
        archive::extract_zip(&artifact.path, runtime_dir, &[])
    }
    .map_err(|e| LauncherError::Provision(format!("extracting {:?}: {e}", artifact.path)))?;

    if let Err(err) = std::fs::remove_file(&artifact.path) {
        warn!("Could not delete runtime archive {:?}: {}", artifact.path, err);
    }

    let top_level = summary.top_level.ok_or_else(|| {
        LauncherError::Provision(format!("runtime archive {:?} was empty", artifact.path))
    })?;
    let executable = java_executable_from_root(&runtime_dir.join(top_level), platform);
    mark_executable(&executable)?;
    info!("Java runtime installed at {:?}", executable);
    Ok(executable)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> LauncherResult<()> {
    use std::os::unix::fs::PermissionsExt;
    if !path.exists() {
        return Err(LauncherError::Provision(format!(
            "runtime has no executable at {path:?}"
        )));
    }
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| LauncherError::io(path, e))
}

#[cfg(not(unix))]
fn mark_executable(path: &Path) -> LauncherResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(LauncherError::Provision(format!(
            "runtime has no executable at {path:?}"
        )))
    }
}

fn ensure_min_disk_space(path: &Path, minimum_bytes: u64) -> LauncherResult<()> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut best_len = 0usize;
    let mut available = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if canonical.starts_with(mount) && mount.as_os_str().len() >= best_len {
            best_len = mount.as_os_str().len();
            available = Some(disk.available_space());
        }
    }
    match available {
        Some(bytes) if bytes < minimum_bytes => Err(LauncherError::Provision(format!(
            "not enough disk space for a runtime: {bytes} bytes free, {minimum_bytes} required"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archive::fixtures::{write_tar_gz, write_zip};
    use crate::core::events::EventSink;
    use crate::core::http::{build_http_client, FETCH_TIMEOUT};
    use crate::core::testutil::{scratch_dir, TestServer};

    struct FixedSource {
        release: RuntimeRelease,
    }

    #[async_trait]
    impl RuntimeSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn latest(&self, _downloader: &Downloader, _major: u32) -> LauncherResult<Option<RuntimeRelease>> {
            Ok(Some(self.release.clone()))
        }
    }

    struct EmptySource;

    #[async_trait]
    impl RuntimeSource for EmptySource {
        fn name(&self) -> &'static str {
            "empty"
        }

        async fn latest(&self, _downloader: &Downloader, _major: u32) -> LauncherResult<Option<RuntimeRelease>> {
            Ok(None)
        }
    }

    fn orchestrator() -> DownloadOrchestrator {
        let downloader = Downloader::new(build_http_client(FETCH_TIMEOUT).unwrap());
        DownloadOrchestrator::new(downloader, EventSink::disabled())
    }

    fn release(server: &TestServer, path: &str, file_name: &str, body: &[u8], hash: Option<ContentHash>) -> RuntimeRelease {
        RuntimeRelease {
            url: server.url(path),
            file_name: file_name.to_string(),
            size: body.len() as u64,
            hash,
            version: "8u402-b06".into(),
        }
    }

    #[tokio::test]
    async fn tar_gz_runtime_is_extracted_and_archive_removed() {
        let dir = scratch_dir("provision-tgz");
        let archive_path = dir.join("fixture.tar.gz");
        write_tar_gz(
            &archive_path,
            &[("jdk8u402-b06/bin/java", b"#!/bin/sh\n"), ("jdk8u402-b06/release", b"8")],
        );
        let body = std::fs::read(&archive_path).unwrap();
        let server = TestServer::start(vec![("/runtime.tar.gz", body.clone())]).await;

        let runtime_dir = dir.join("runtime").join("x64");
        let source = FixedSource {
            release: release(&server, "/runtime.tar.gz", "OpenJDK8U-jdk_x64_linux.tar.gz", &body, None),
        };
        let provisioner =
            JavaProvisioner::new(Arc::new(source), runtime_dir.clone(), Platform::Linux).with_min_free_space(0);

        let executable = provisioner.provision(&mut orchestrator(), 1).await.unwrap();
        assert!(executable.ends_with("bin/java"));
        assert_eq!(executable, runtime_dir.join("jdk8u402-b06/bin/java"));
        assert!(executable.is_file());
        assert!(!runtime_dir.join("OpenJDK8U-jdk_x64_linux.tar.gz").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&executable).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn zip_runtime_checksum_is_verified() {
        let dir = scratch_dir("provision-zip");
        let archive_path = dir.join("fixture.zip");
        write_zip(&archive_path, &[("jdk8u402-b06-jre/bin/java", b"bin")]);
        let body = std::fs::read(&archive_path).unwrap();
        let server = TestServer::start(vec![("/rt.zip", body.clone())]).await;
        let runtime_dir = dir.join("runtime");

        let good_hash = {
            use sha2::{Digest, Sha256};
            hex::encode(Sha256::digest(&body))
        };
        let good = JavaProvisioner::new(
            Arc::new(FixedSource {
                release: release(&server, "/rt.zip", "rt.zip", &body, Some(ContentHash::Sha256(good_hash))),
            }),
            runtime_dir.clone(),
            Platform::Linux,
        )
        .with_min_free_space(0);
        let executable = good.provision(&mut orchestrator(), 1).await.unwrap();
        assert_eq!(executable, runtime_dir.join("jdk8u402-b06-jre/bin/java"));

        let bad = JavaProvisioner::new(
            Arc::new(FixedSource {
                release: release(&server, "/rt.zip", "rt.zip", &body, Some(ContentHash::Sha256("00".repeat(32)))),
            }),
            runtime_dir.clone(),
            Platform::Linux,
        )
        .with_min_free_space(0);
        let err = bad.provision(&mut orchestrator(), 1).await.unwrap_err();
        assert!(matches!(err, LauncherError::Provision(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_build_is_a_provision_error() {
        let dir = scratch_dir("provision-none");
        let provisioner = JavaProvisioner::new(Arc::new(EmptySource), dir.clone(), Platform::Linux);

        let mut orch = orchestrator();
        let err = provisioner.provision(&mut orch, 1).await.unwrap_err();
        assert!(matches!(err, LauncherError::Provision(_)));
        assert!(orch.queue(Category::Java).is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn adoptium_response_maps_to_release() {
        let body = br#"[{
            "binary": {"package": {"checksum": "abc123", "link": "https://github.com/x/OpenJDK8U-jdk_x64_linux_hotspot_8u402b06.tar.gz",
                        "name": "OpenJDK8U-jdk_x64_linux_hotspot_8u402b06.tar.gz", "size": 103015436}},
            "version": {"openjdk_version": "1.8.0_402-b06"}
        }]"#;
        let server = TestServer::start(vec![(
            "/8/hotspot?architecture=x64&image_type=jdk&os=linux&vendor=eclipse",
            body.to_vec(),
        )])
        .await;

        let source = AdoptiumSource::new(Platform::Linux).with_api_base(server.base_url.clone());
        let downloader = Downloader::new(build_http_client(FETCH_TIMEOUT).unwrap());
        let found = source.latest(&downloader, 8).await.unwrap().unwrap();
        assert_eq!(found.file_name, "OpenJDK8U-jdk_x64_linux_hotspot_8u402b06.tar.gz");
        assert_eq!(found.size, 103015436);
        assert_eq!(found.hash, Some(ContentHash::Sha256("abc123".into())));
        assert_eq!(found.version, "1.8.0_402-b06");
    }

    #[tokio::test]
    async fn corretto_head_reports_advertised_size() {
        let server = TestServer::start(vec![("/amazon-corretto-8-x64-macos-jdk.tar.gz", vec![0u8; 4096])]).await;
        let source = CorrettoSource::with_url(server.url("/amazon-corretto-8-x64-macos-jdk.tar.gz"));
        let downloader = Downloader::new(build_http_client(FETCH_TIMEOUT).unwrap());

        let found = source.latest(&downloader, 8).await.unwrap().unwrap();
        assert_eq!(found.size, 4096);
        assert_eq!(found.file_name, "amazon-corretto-8-x64-macos-jdk.tar.gz");
        assert!(found.hash.is_none());
        assert!(source.latest(&downloader, 17).await.unwrap().is_none());
    }
}
