pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::config::{ConfigStore, JsonConfigStore, LauncherConfig};
pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::events::{EventSink, LauncherEvent};
pub use crate::core::launch::{GameExit, LaunchPipeline, LaunchRequest, LaunchState};
pub use crate::core::worker::{spawn_worker, ResultEnvelope, TaskEnvelope, WorkerHandle};

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
/// Calling it again is a no-op.
pub fn init_logging() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,conduit_lib=debug")),
        )
        .try_init();

    if installed.is_ok() {
        tracing::info!("Conduit core {} ready", env!("CARGO_PKG_VERSION"));
    }
}
