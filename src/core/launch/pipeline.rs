// ─── Launch Pipeline ───
// Drives one launch attempt: Java check, validation passes, downloads,
// native extraction, spawn. Every state change is emitted as an event.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::classpath::build_classpath;
use super::composer::{LaunchComposer, ServerAddress};
use super::natives::NativeExtractor;
use super::process::{GameExit, ProcessSlot, RunningGame};
use super::state::LaunchState;
use super::validation::{GameValidator, ValidatedGame};
use crate::core::artifact::{Category, Library};
use crate::core::assets::RESOURCES_URL;
use crate::core::auth::GameAccount;
use crate::core::config::{ConfigStore, LauncherConfig};
use crate::core::downloader::{DownloadOrchestrator, DownloadReport, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent};
use crate::core::http::{build_http_client, FETCH_TIMEOUT};
use crate::core::java::paths::ensure_install_root;
use crate::core::java::{discovery_for, validate_executable, JavaDiscovery, JavaProvisioner};
use crate::core::platform::Platform;
use crate::core::version::index::VERSION_INDEX_URL;

/// What to launch and as whom.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub version_id: String,
    pub account: GameAccount,
    /// Game directory name under `instances/`. `None` runs in the common dir.
    pub instance: Option<String>,
    pub server: Option<ServerAddress>,
    /// Server or modpack libraries; they override Mojang libraries by key.
    pub server_libraries: Vec<Library>,
    pub extra_loader_jar: Option<PathBuf>,
    pub force_refresh: bool,
}

impl LaunchRequest {
    pub fn new(version_id: impl Into<String>, account: GameAccount) -> Self {
        Self {
            version_id: version_id.into(),
            account,
            instance: None,
            server: None,
            server_libraries: Vec::new(),
            extra_loader_jar: None,
            force_refresh: false,
        }
    }
}

pub struct LaunchPipeline {
    config: LauncherConfig,
    platform: Platform,
    downloader: Downloader,
    events: EventSink,
    discovery: Box<dyn JavaDiscovery>,
    provisioner: JavaProvisioner,
    slot: ProcessSlot,
    store: Option<Arc<dyn ConfigStore>>,
    index_url: String,
    resources_url: String,
    state: LaunchState,
}

impl LaunchPipeline {
    pub fn new(config: LauncherConfig, events: EventSink) -> LauncherResult<Self> {
        let platform = Platform::current();
        let runtime_dir = config.runtime_dir();
        Ok(Self {
            downloader: Downloader::new(build_http_client(FETCH_TIMEOUT)?),
            discovery: discovery_for(platform, &runtime_dir),
            provisioner: JavaProvisioner::for_platform(platform, runtime_dir),
            config,
            platform,
            events,
            slot: ProcessSlot::default(),
            store: None,
            index_url: VERSION_INDEX_URL.to_string(),
            resources_url: RESOURCES_URL.to_string(),
            state: LaunchState::Init,
        })
    }

    pub fn with_java(mut self, discovery: Box<dyn JavaDiscovery>, provisioner: JavaProvisioner) -> Self {
        self.discovery = discovery;
        self.provisioner = provisioner;
        self
    }

    pub fn with_endpoints(mut self, index_url: impl Into<String>, resources_url: impl Into<String>) -> Self {
        self.index_url = index_url.into();
        self.resources_url = resources_url.into();
        self
    }

    /// Persist a discovered or provisioned Java executable through `store`.
    pub fn with_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    pub fn slot(&self) -> &ProcessSlot {
        &self.slot
    }

    pub fn orchestrator(&self) -> DownloadOrchestrator {
        DownloadOrchestrator::new(self.downloader.clone(), self.events.clone())
    }

    fn advance(&mut self, next: LaunchState) -> LauncherResult<()> {
        self.state.transition(next)?;
        info!("Launch state -> {:?}", next);
        self.events.emit(LauncherEvent::StateChanged { state: next });
        Ok(())
    }

    /// Start a fresh attempt.
    pub fn reset(&mut self) {
        self.state = LaunchState::Init;
    }

    /// Use the configured runtime when it still validates, otherwise discover
    /// one, otherwise provision one. The chosen path is written back to the
    /// in-memory configuration and to the store, if any.
    #[instrument(skip_all)]
    pub async fn resolve_java(&mut self, orchestrator: &mut DownloadOrchestrator) -> LauncherResult<PathBuf> {
        self.advance(LaunchState::JavaCheck)?;

        if let Some(configured) = self.config.java_executable.clone() {
            let root = configured
                .parent()
                .map(|bin| ensure_install_root(bin, self.platform))
                .unwrap_or_else(|| configured.clone());
            if validate_executable(&root, &configured, self.platform).await.valid {
                self.advance(LaunchState::JavaReady)?;
                return Ok(configured);
            }
            warn!("Configured Java {:?} is not usable, searching", configured);
        }

        let executable = match self.discovery.discover().await {
            Some(candidate) => candidate.executable,
            None => {
                self.advance(LaunchState::JavaProvisioning)?;
                let limit = self.config.download_limits.java;
                match self.provisioner.provision(orchestrator, limit).await {
                    Ok(path) => path,
                    Err(err) => {
                        self.advance(LaunchState::JavaFailed)?;
                        self.events.emit(LauncherEvent::Error {
                            context: "java".into(),
                            message: err.to_string(),
                        });
                        return Err(err);
                    }
                }
            }
        };

        self.config.java_executable = Some(executable.clone());
        if let Some(store) = &self.store {
            if let Err(err) = store.set_java_executable(&executable) {
                warn!("Could not persist Java path {:?}: {}", executable, err);
            }
        }
        self.advance(LaunchState::JavaReady)?;
        Ok(executable)
    }

    pub fn validator(&self) -> GameValidator {
        GameValidator::new(&self.config, self.downloader.clone(), self.events.clone(), self.platform)
            .with_endpoints(self.index_url.clone(), self.resources_url.clone())
    }

    /// Run the four validation passes, filling the download queues.
    pub async fn validate(
        &mut self,
        orchestrator: &mut DownloadOrchestrator,
        request: &LaunchRequest,
    ) -> LauncherResult<ValidatedGame> {
        let validator = self.validator();
        validator
            .validate(
                orchestrator,
                &request.version_id,
                request.force_refresh,
                &request.server_libraries,
                |phase| self.advance(phase.into()),
            )
            .await
    }

    /// Drain assets, libraries and files, then unpack natives from the
    /// extraction backlog.
    pub async fn download(
        &mut self,
        orchestrator: &mut DownloadOrchestrator,
        natives: &NativeExtractor,
        libraries: &[Library],
    ) -> LauncherResult<DownloadReport> {
        self.advance(LaunchState::Downloading)?;
        for job in natives.jobs(libraries) {
            orchestrator.queue_extraction(job);
        }

        let limits = &self.config.download_limits;
        let requests = [
            (Category::Assets, limits.assets),
            (Category::Libraries, limits.libraries),
            (Category::Files, limits.files),
        ];
        let mut extracting = Ok(());
        let report = orchestrator
            .process_with(&requests, |_| extracting = self.advance(LaunchState::Extracting))
            .await;
        extracting?;

        if let Some(missing) = report
            .category(Category::Assets)
            .filter(|c| !c.failures.is_empty())
        {
            warn!("{} assets could not be downloaded", missing.failures.len());
        }
        let required_failures: usize = [Category::Libraries, Category::Files]
            .into_iter()
            .filter_map(|c| report.category(c))
            .map(|c| c.failures.len())
            .sum();
        if required_failures > 0 {
            return Err(LauncherError::Launch(format!(
                "{required_failures} required files could not be downloaded"
            )));
        }
        Ok(report)
    }

    /// Everything up to a running process.
    pub async fn launch(&mut self, request: &LaunchRequest) -> LauncherResult<RunningGame> {
        let guard = self.slot.try_acquire()?;
        self.reset();
        let mut orchestrator = self.orchestrator();

        let java = self.resolve_java(&mut orchestrator).await?;
        let validated = self.validate(&mut orchestrator, request).await?;

        let natives = NativeExtractor::prepare(&self.config.temp_dir()).await?;
        let prepared = self.download(&mut orchestrator, &natives, &validated.libraries).await;
        if let Err(err) = prepared {
            natives.cleanup().await;
            return Err(err);
        }

        self.advance(LaunchState::Launching)?;
        let manifest = &validated.manifest;
        let classpath = build_classpath(
            &manifest.client_jar_path(&self.config.versions_dir()),
            request.extra_loader_jar.as_deref(),
            &validated.libraries,
            &request.server_libraries,
        );
        let game_dir = game_dir_for(&self.config, request.instance.as_deref());

        let composer = LaunchComposer::new(&self.config, manifest, &request.account, self.platform)
            .game_dir(game_dir)
            .natives_dir(natives.dir())
            .server(request.server.clone());
        let child = match composer.spawn(&java, &classpath).await {
            Ok(child) => child,
            Err(err) => {
                natives.cleanup().await;
                self.events.emit(LauncherEvent::Error {
                    context: "launch".into(),
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        self.advance(LaunchState::Running)?;
        Ok(RunningGame::attach(
            child,
            guard,
            Some(natives.dir().to_path_buf()),
            self.events.clone(),
        ))
    }

    /// Wait for the game and record how it ended.
    pub async fn finish(&mut self, game: RunningGame) -> LauncherResult<GameExit> {
        let exit = game.wait().await?;
        self.advance(exit.state)?;
        Ok(exit)
    }

    /// Launch and wait for exit.
    pub async fn run(&mut self, request: &LaunchRequest) -> LauncherResult<GameExit> {
        let game = self.launch(request).await?;
        self.finish(game).await
    }
}

/// Game directory for a request.
pub fn game_dir_for(config: &LauncherConfig, instance: Option<&str>) -> PathBuf {
    match instance {
        Some(name) => config.instances_dir().join(name),
        None => config.common_dir.clone(),
    }
}
