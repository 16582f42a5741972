// ─── Game Validation ───
// Version, assets, libraries, files. Each pass fills one download queue and
// reports completion; callers decide what entering a pass means to them.

use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::core::artifact::{collect_invalid, Category, Library, VALIDATION_FANOUT};
use crate::core::assets::{AssetIndexResolver, RESOURCES_URL};
use crate::core::config::LauncherConfig;
use crate::core::downloader::{DownloadOrchestrator, Downloader};
use crate::core::error::LauncherResult;
use crate::core::events::{EventSink, LauncherEvent, ValidationPhase};
use crate::core::libraries::LibraryResolver;
use crate::core::platform::Platform;
use crate::core::version::index::VERSION_INDEX_URL;
use crate::core::version::{ManifestLoader, VersionManifest};

/// Outcome of the validation passes.
#[derive(Debug, Clone)]
pub struct ValidatedGame {
    pub manifest: VersionManifest,
    /// Mojang libraries for this platform plus native server libraries.
    pub libraries: Vec<Library>,
}

#[derive(Debug, Clone)]
pub struct GameValidator {
    downloader: Downloader,
    events: EventSink,
    platform: Platform,
    versions_dir: PathBuf,
    assets_dir: PathBuf,
    libraries_dir: PathBuf,
    allow_prerelease: bool,
    index_url: String,
    resources_url: String,
}

impl GameValidator {
    pub fn new(config: &LauncherConfig, downloader: Downloader, events: EventSink, platform: Platform) -> Self {
        Self {
            downloader,
            events,
            platform,
            versions_dir: config.versions_dir(),
            assets_dir: config.assets_dir(),
            libraries_dir: config.libraries_dir(),
            allow_prerelease: config.allow_prerelease,
            index_url: VERSION_INDEX_URL.to_string(),
            resources_url: RESOURCES_URL.to_string(),
        }
    }

    pub fn with_endpoints(mut self, index_url: impl Into<String>, resources_url: impl Into<String>) -> Self {
        self.index_url = index_url.into();
        self.resources_url = resources_url.into();
        self
    }

    /// Run the four passes in order. `enter` is called before each pass and
    /// may abort the run; `PhaseComplete` is emitted after each one.
    #[instrument(skip_all, fields(version = %version_id))]
    pub async fn validate<F>(
        &self,
        orchestrator: &mut DownloadOrchestrator,
        version_id: &str,
        force_refresh: bool,
        server_libraries: &[Library],
        mut enter: F,
    ) -> LauncherResult<ValidatedGame>
    where
        F: FnMut(ValidationPhase) -> LauncherResult<()>,
    {
        enter(ValidationPhase::Version)?;
        let loader = ManifestLoader::new(self.downloader.clone(), self.versions_dir.clone(), self.allow_prerelease)
            .with_index_url(self.index_url.clone());
        let manifest = loader.load(version_id, force_refresh).await?;
        self.complete(ValidationPhase::Version);

        enter(ValidationPhase::Assets)?;
        AssetIndexResolver::new(self.downloader.clone(), self.assets_dir.clone())
            .with_resources_url(self.resources_url.clone())
            .resolve(
                &manifest.asset_index,
                force_refresh,
                orchestrator.queue_mut(Category::Assets),
                &self.events,
            )
            .await?;
        self.complete(ValidationPhase::Assets);

        enter(ValidationPhase::Libraries)?;
        let resolver = LibraryResolver::new(self.libraries_dir.clone(), self.platform);
        let mut libraries = resolver
            .resolve(&manifest.libraries, orchestrator.queue_mut(Category::Libraries))
            .await;
        let server_artifacts = server_libraries.iter().map(|l| l.artifact.clone()).collect();
        for artifact in collect_invalid(server_artifacts, VALIDATION_FANOUT, |_| {}).await {
            orchestrator.enqueue(Category::Libraries, artifact);
        }
        libraries.extend(server_libraries.iter().filter(|l| l.native).cloned());
        self.complete(ValidationPhase::Libraries);

        enter(ValidationPhase::Files)?;
        let files = manifest.misc_files(&self.versions_dir, &self.assets_dir);
        for artifact in collect_invalid(files, VALIDATION_FANOUT, |_| {}).await {
            orchestrator.enqueue(Category::Files, artifact);
        }
        self.complete(ValidationPhase::Files);

        debug!(
            "Queued {} assets, {} libraries, {} files",
            orchestrator.queue(Category::Assets).len(),
            orchestrator.queue(Category::Libraries).len(),
            orchestrator.queue(Category::Files).len()
        );
        Ok(ValidatedGame { manifest, libraries })
    }

    fn complete(&self, phase: ValidationPhase) {
        self.events.emit(LauncherEvent::PhaseComplete { phase });
    }
}
