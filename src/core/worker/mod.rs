// ─── Provisioning Worker ───
// Runs discovery, validation and downloads on its own task. Callers talk to
// it only through task and result envelopes; events raised while a function
// runs are forwarded as they happen, before that function's result.

pub mod envelope;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::core::artifact::Category;
use crate::core::config::LauncherConfig;
use crate::core::downloader::{DownloadOrchestrator, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent};
use crate::core::http::{build_http_client, FETCH_TIMEOUT};
use crate::core::java::{discovery_for, JavaDiscovery, JavaProvisioner, ProvisionHandle};
use crate::core::launch::GameValidator;
use crate::core::platform::Platform;

pub use envelope::{ResultEnvelope, TaskEnvelope};
use envelope::{COMPLETE, ENQUEUE_OPENJDK, ERROR, EXECUTE, PROCESS_DL_QUEUES, VALIDATE_EVERYTHING, VALIDATE_JAVA};

/// One entry of the `processDlQueues` argument.
#[derive(Debug, Deserialize)]
struct QueueRequest {
    id: Category,
    #[serde(default)]
    limit: Option<usize>,
}

/// The worker before it is started. Builders swap out collaborators.
pub struct Worker {
    functions: Functions,
    events: mpsc::UnboundedReceiver<LauncherEvent>,
}

struct Functions {
    config: LauncherConfig,
    orchestrator: DownloadOrchestrator,
    validator: GameValidator,
    discovery: Box<dyn JavaDiscovery>,
    provisioner: JavaProvisioner,
    java: Option<ProvisionHandle>,
}

impl Worker {
    pub fn new(config: LauncherConfig) -> LauncherResult<Self> {
        let platform = Platform::current();
        let downloader = Downloader::new(build_http_client(FETCH_TIMEOUT)?);
        let (sink, events) = EventSink::channel();
        let runtime_dir = config.runtime_dir();
        Ok(Self {
            functions: Functions {
                orchestrator: DownloadOrchestrator::new(downloader.clone(), sink.clone()),
                validator: GameValidator::new(&config, downloader, sink, platform),
                discovery: discovery_for(platform, &runtime_dir),
                provisioner: JavaProvisioner::for_platform(platform, runtime_dir),
                java: None,
                config,
            },
            events,
        })
    }

    pub fn with_java(mut self, discovery: Box<dyn JavaDiscovery>, provisioner: JavaProvisioner) -> Self {
        self.functions.discovery = discovery;
        self.functions.provisioner = provisioner;
        self
    }

    pub fn with_endpoints(mut self, index_url: impl Into<String>, resources_url: impl Into<String>) -> Self {
        self.functions.validator = self.functions.validator.with_endpoints(index_url, resources_url);
        self
    }

    pub fn spawn(self) -> WorkerHandle {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let join = tokio::spawn(self.run(task_rx, result_tx));
        WorkerHandle {
            tasks: task_tx,
            results: result_rx,
            join,
        }
    }

    async fn run(
        self,
        mut tasks: mpsc::UnboundedReceiver<TaskEnvelope>,
        results: mpsc::UnboundedSender<ResultEnvelope>,
    ) {
        let Worker {
            mut functions,
            mut events,
        } = self;
        info!("Provisioning worker started");

        while let Some(task) = tasks.recv().await {
            debug!("Worker task {}::{}", task.task, task.function);
            let replies = {
                let call = functions.dispatch(task);
                tokio::pin!(call);
                loop {
                    tokio::select! {
                        replies = &mut call => break replies,
                        Some(event) = events.recv() => forward(&results, event),
                    }
                }
            };
            while let Ok(event) = events.try_recv() {
                forward(&results, event);
            }
            for reply in replies {
                if results.send(reply).is_err() {
                    debug!("Result receiver dropped");
                }
            }
        }

        info!("Provisioning worker stopped");
    }
}

fn forward(results: &mpsc::UnboundedSender<ResultEnvelope>, event: LauncherEvent) {
    if let Some(envelope) = ResultEnvelope::from_event(event) {
        let _ = results.send(envelope);
    }
}

impl Functions {
    async fn dispatch(&mut self, task: TaskEnvelope) -> Vec<ResultEnvelope> {
        if task.task != EXECUTE {
            let err = LauncherError::Other(format!("unknown task '{}'", task.task));
            return vec![ResultEnvelope::failure(ERROR, &err)];
        }

        let outcome = match task.function.as_str() {
            VALIDATE_JAVA => self.validate_java().await,
            ENQUEUE_OPENJDK => Ok(self.enqueue_openjdk().await),
            VALIDATE_EVERYTHING => self.validate_everything(&task.args).await,
            PROCESS_DL_QUEUES => self.process_dl_queues(&task.args).await,
            other => Err(LauncherError::Other(format!("unknown function '{other}'"))),
        };

        outcome.unwrap_or_else(|err| {
            error!("Worker function {} failed: {}", task.function, err);
            vec![ResultEnvelope::failure(&task.function, &err)]
        })
    }

    /// Best runtime on this machine, or `null`.
    async fn validate_java(&mut self) -> LauncherResult<Vec<ResultEnvelope>> {
        let found = self.discovery.discover().await.map(|c| c.executable);
        if let Some(path) = &found {
            self.config.java_executable = Some(path.clone());
        }
        let result = found.map_or(Value::Null, |path| json!(path));
        Ok(vec![ResultEnvelope::result(VALIDATE_JAVA, result)])
    }

    /// `true` once a runtime is on the java queue. A failed lookup answers
    /// `false` along with the error.
    async fn enqueue_openjdk(&mut self) -> Vec<ResultEnvelope> {
        match self.provisioner.enqueue(&mut self.orchestrator).await {
            Ok(handle) => {
                self.java = Some(handle);
                vec![ResultEnvelope::result(ENQUEUE_OPENJDK, json!(true))]
            }
            Err(err) => {
                error!("Could not queue a Java runtime: {}", err);
                let mut reply = ResultEnvelope::failure(ENQUEUE_OPENJDK, &err);
                reply.result = Some(json!(false));
                vec![reply]
            }
        }
    }

    /// `args`: version id, optional force-refresh flag.
    #[instrument(skip_all)]
    async fn validate_everything(&mut self, args: &[Value]) -> LauncherResult<Vec<ResultEnvelope>> {
        let version_id = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| LauncherError::Other("validateEverything needs a version id".into()))?;
        let force = args.get(1).and_then(Value::as_bool).unwrap_or(false);

        let game = self
            .validator
            .validate(&mut self.orchestrator, version_id, force, &[], |_| Ok(()))
            .await?;

        let queued = |category| self.orchestrator.queue(category).len();
        let result = json!({
            "versionId": game.manifest.id,
            "mainClass": game.manifest.main_class,
            "libraries": game.libraries.len(),
            "queued": {
                "assets": queued(Category::Assets),
                "libraries": queued(Category::Libraries),
                "files": queued(Category::Files),
            },
        });
        Ok(vec![ResultEnvelope::result(VALIDATE_EVERYTHING, result)])
    }

    /// `args`: optional `[{id, limit?}]`. Without it every category is
    /// drained at the configured limits.
    async fn process_dl_queues(&mut self, args: &[Value]) -> LauncherResult<Vec<ResultEnvelope>> {
        let limits = &self.config.download_limits;
        let limit_for = |category| match category {
            Category::Assets => limits.assets,
            Category::Libraries => limits.libraries,
            Category::Files => limits.files,
            Category::Java => limits.java,
        };
        let requests: Vec<(Category, usize)> = match args.first() {
            Some(raw) => serde_json::from_value::<Vec<QueueRequest>>(raw.clone())?
                .into_iter()
                .map(|r| (r.id, r.limit.unwrap_or_else(|| limit_for(r.id))))
                .collect(),
            None => Category::ALL.iter().map(|&c| (c, limit_for(c))).collect(),
        };

        let report = self.orchestrator.process(&requests).await;
        let mut replies = vec![ResultEnvelope::result(PROCESS_DL_QUEUES, serde_json::to_value(&report)?)];

        if requests.iter().any(|(c, _)| *c == Category::Java) {
            let executable = self.java.take().and_then(|handle| handle.executable());
            if let Some(path) = executable {
                self.config.java_executable = Some(path.clone());
                replies.push(ResultEnvelope {
                    context: COMPLETE.to_string(),
                    data: Some(json!("java")),
                    result: Some(json!(path)),
                    ..ResultEnvelope::default()
                });
            }
        }
        Ok(replies)
    }
}

/// Caller side of a running worker.
pub struct WorkerHandle {
    tasks: mpsc::UnboundedSender<TaskEnvelope>,
    results: mpsc::UnboundedReceiver<ResultEnvelope>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn send(&self, task: TaskEnvelope) -> LauncherResult<()> {
        self.tasks
            .send(task)
            .map_err(|_| LauncherError::Other("worker has stopped".into()))
    }

    pub async fn recv(&mut self) -> Option<ResultEnvelope> {
        self.results.recv().await
    }

    /// Close the task channel and wait for the worker to finish the task
    /// it is on. Results not yet received are returned.
    pub async fn shutdown(self) -> Vec<ResultEnvelope> {
        let WorkerHandle {
            tasks,
            mut results,
            join,
        } = self;
        drop(tasks);
        if let Err(err) = join.await {
            error!("Worker task ended abnormally: {}", err);
        }
        let mut rest = Vec::new();
        while let Ok(envelope) = results.try_recv() {
            rest.push(envelope);
        }
        rest
    }

    /// Raw channel ends for callers that route messages themselves.
    pub fn into_channels(self) -> (mpsc::UnboundedSender<TaskEnvelope>, mpsc::UnboundedReceiver<ResultEnvelope>) {
        (self.tasks, self.results)
    }
}

/// Start a worker with the default collaborators for this platform.
pub fn spawn_worker(config: LauncherConfig) -> LauncherResult<WorkerHandle> {
    Ok(Worker::new(config)?.spawn())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::envelope::{PROGRESS, VALIDATE};
    use super::*;
    use crate::core::archive::fixtures::write_tar_gz;
    use crate::core::java::provision::{RuntimeRelease, RuntimeSource};
    use crate::core::java::LinuxDiscovery;
    use crate::core::testutil::{scratch_dir, sha1_hex, TestServer};

    struct FixedRuntime(Option<RuntimeRelease>);

    #[async_trait]
    impl RuntimeSource for FixedRuntime {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn latest(&self, _downloader: &Downloader, _major: u32) -> LauncherResult<Option<RuntimeRelease>> {
            Ok(self.0.clone())
        }
    }

    fn worker(dir: &std::path::Path, release: Option<RuntimeRelease>) -> Worker {
        let config = LauncherConfig::rooted_at(dir);
        let discovery = LinuxDiscovery::with_search_dirs(&dir.join("jvm"), &config.runtime_dir());
        let provisioner = JavaProvisioner::new(Arc::new(FixedRuntime(release)), config.runtime_dir(), Platform::Linux)
            .with_min_free_space(0);
        Worker::new(config)
            .unwrap()
            .with_java(Box::new(discovery), provisioner)
    }

    async fn until(handle: &mut WorkerHandle, context: &str) -> Vec<ResultEnvelope> {
        let mut seen = Vec::new();
        while let Some(envelope) = handle.recv().await {
            let done = envelope.context == context && (envelope.result.is_some() || envelope.error.is_some());
            seen.push(envelope);
            if done {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn validate_java_answers_null_without_runtimes() {
        let dir = scratch_dir("worker-no-java");
        let mut handle = worker(&dir, None).spawn();

        handle.send(TaskEnvelope::execute(VALIDATE_JAVA, Vec::new())).unwrap();
        let replies = until(&mut handle, VALIDATE_JAVA).await;
        assert_eq!(replies.last().unwrap().result, Some(Value::Null));

        handle.send(TaskEnvelope::execute(ENQUEUE_OPENJDK, Vec::new())).unwrap();
        let replies = until(&mut handle, ENQUEUE_OPENJDK).await;
        let last = replies.last().unwrap();
        assert_eq!(last.result, Some(json!(false)));
        assert_eq!(last.error.as_ref().unwrap()["kind"], "provision");

        assert!(handle.shutdown().await.is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unknown_function_and_bad_args_are_errors() {
        let dir = scratch_dir("worker-unknown");
        let mut handle = worker(&dir, None).spawn();

        handle.send(TaskEnvelope::execute("reticulateSplines", Vec::new())).unwrap();
        let reply = handle.recv().await.unwrap();
        assert_eq!(reply.context, "reticulateSplines");
        assert_eq!(reply.error.unwrap()["kind"], "other");

        handle.send(TaskEnvelope::execute(VALIDATE_EVERYTHING, Vec::new())).unwrap();
        let reply = handle.recv().await.unwrap();
        assert!(reply.is_error());

        handle
            .send(TaskEnvelope {
                task: "changeContext".into(),
                function: VALIDATE_JAVA.into(),
                args: Vec::new(),
            })
            .unwrap();
        let reply = handle.recv().await.unwrap();
        assert_eq!(reply.context, ERROR);

        handle.shutdown().await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn provisions_runtime_through_the_java_queue() {
        let dir = scratch_dir("worker-java");
        let archive = dir.join("fixture.tar.gz");
        write_tar_gz(&archive, &[("jdk8u402-b06/bin/java", b"#!/bin/sh\nexit 0\n")]);
        let bytes = std::fs::read(&archive).unwrap();
        let server = TestServer::start(vec![("/jdk.tar.gz", bytes.clone())]).await;

        let release = RuntimeRelease {
            url: server.url("/jdk.tar.gz"),
            file_name: "OpenJDK8U-jdk_x64_linux.tar.gz".into(),
            size: bytes.len() as u64,
            hash: None,
            version: "8u402-b06".into(),
        };
        let runtime_dir = LauncherConfig::rooted_at(&dir).runtime_dir();
        let mut handle = worker(&dir, Some(release)).spawn();

        handle.send(TaskEnvelope::execute(ENQUEUE_OPENJDK, Vec::new())).unwrap();
        let replies = until(&mut handle, ENQUEUE_OPENJDK).await;
        assert_eq!(replies.last().unwrap().result, Some(json!(true)));

        handle
            .send(TaskEnvelope::execute(
                PROCESS_DL_QUEUES,
                vec![json!([{"id": "java", "limit": 1}])],
            ))
            .unwrap();
        let mut replies = until(&mut handle, PROCESS_DL_QUEUES).await;
        replies.extend(handle.shutdown().await);

        let contexts: Vec<&str> = replies.iter().map(|r| r.context.as_str()).collect();
        assert!(contexts.contains(&PROGRESS));
        let completes: Vec<&ResultEnvelope> = replies.iter().filter(|r| r.context == COMPLETE).collect();
        assert_eq!(completes.len(), 2);
        assert_eq!(completes[0].data, Some(json!("download")));
        let java = completes[1];
        assert_eq!(java.data, Some(json!("java")));
        assert_eq!(java.result, Some(json!(runtime_dir.join("jdk8u402-b06/bin/java"))));

        let report = &replies.iter().find(|r| r.context == PROCESS_DL_QUEUES).unwrap().result;
        assert_eq!(report.as_ref().unwrap()["categories"][0]["completed"], 1);
        assert!(!runtime_dir.join("OpenJDK8U-jdk_x64_linux.tar.gz").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn validate_everything_reports_phases_and_queues() {
        let dir = scratch_dir("worker-validate");
        let client: &[u8] = b"client";
        let server = TestServer::start(vec![("/indexes/empty.json", br#"{"objects":{}}"#.to_vec())]).await;
        let manifest = json!({
            "id": "1.8.9",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main",
            "assetIndex": {"id": "empty", "url": server.url("/indexes/empty.json")},
            "minecraftArguments": "--username ${auth_player_name}",
            "downloads": {"client": {"sha1": sha1_hex(client), "size": client.len(), "url": server.url("/client.jar")}},
            "libraries": []
        });
        let config = LauncherConfig::rooted_at(&dir);
        let cached = config.version_dir("1.8.9").join("1.8.9.json");
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, manifest.to_string()).unwrap();

        let mut handle = worker(&dir, None)
            .with_endpoints("http://127.0.0.1:9/unused", server.url("/objects"))
            .spawn();
        handle
            .send(TaskEnvelope::execute(VALIDATE_EVERYTHING, vec![json!("1.8.9")]))
            .unwrap();
        let replies = until(&mut handle, VALIDATE_EVERYTHING).await;

        let phases: Vec<Value> = replies
            .iter()
            .filter(|r| r.context == VALIDATE)
            .filter_map(|r| r.data.clone())
            .collect();
        assert_eq!(phases, vec![json!("version"), json!("assets"), json!("libraries"), json!("files")]);

        let result = replies.last().unwrap().result.clone().unwrap();
        assert_eq!(result["versionId"], "1.8.9");
        assert_eq!(result["queued"]["assets"], 0);
        assert_eq!(result["queued"]["files"], 1);

        handle.shutdown().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
