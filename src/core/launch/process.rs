// ─── Game Process ───
// Watches a spawned game: forwards its output, spots crash markers and
// reports how it ended.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::{error, info, warn};

use super::natives::remove_natives_dir;
use super::state::LaunchState;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent};

pub const CRASH_MARKER: &str = "#@!@# Game crashed! Crash report saved to: #@!@#";
pub const STOPPING_MARKER: &str = "Stopping!";

/// Allows one managed game process at a time.
#[derive(Debug, Clone, Default)]
pub struct ProcessSlot {
    busy: Arc<AtomicBool>,
}

impl ProcessSlot {
    pub fn try_acquire(&self) -> LauncherResult<SlotGuard> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(LauncherError::Launch("a game process is already running".into()));
        }
        Ok(SlotGuard {
            busy: self.busy.clone(),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Frees the slot when dropped.
#[derive(Debug)]
pub struct SlotGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameExit {
    pub state: LaunchState,
    pub code: Option<i32>,
    pub crash_report: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct OutputScan {
    crashed: bool,
    stopping: bool,
    crash_report: Option<PathBuf>,
}

impl OutputScan {
    fn inspect(&mut self, line: &str) {
        if let Some(index) = line.find(CRASH_MARKER) {
            self.crashed = true;
            let path = line[index + CRASH_MARKER.len()..].trim();
            if !path.is_empty() {
                self.crash_report = Some(PathBuf::from(path));
            }
        } else if line.contains(STOPPING_MARKER) {
            self.stopping = true;
        }
    }

    fn merge(mut self, other: OutputScan) -> Self {
        self.crashed |= other.crashed;
        self.stopping |= other.stopping;
        if self.crash_report.is_none() {
            self.crash_report = other.crash_report;
        }
        self
    }
}

/// Crashed when a crash marker was printed, or when the process failed
/// without ever reaching the shutdown line.
fn terminal_state(scan: &OutputScan, success: bool) -> LaunchState {
    if scan.crashed || (!success && !scan.stopping) {
        LaunchState::Crashed
    } else {
        LaunchState::Exited
    }
}

async fn scan_output<R>(reader: R, stderr: bool, events: EventSink) -> OutputScan
where
    R: AsyncRead + Unpin,
{
    let mut scan = OutputScan::default();
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                scan.inspect(&line);
                events.emit(LauncherEvent::GameOutput { line, stderr });
            }
            Ok(None) => break,
            Err(err) => {
                warn!("Stopped reading game output: {}", err);
                break;
            }
        }
    }
    scan
}

/// A spawned game holding the process slot until it exits.
#[derive(Debug)]
pub struct RunningGame {
    child: Child,
    natives_dir: Option<PathBuf>,
    events: EventSink,
    started_at: DateTime<Utc>,
    _guard: SlotGuard,
}

impl RunningGame {
    pub fn attach(child: Child, guard: SlotGuard, natives_dir: Option<PathBuf>, events: EventSink) -> Self {
        Self {
            child,
            natives_dir,
            events,
            started_at: Utc::now(),
            _guard: guard,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub async fn kill(&mut self) -> LauncherResult<()> {
        self.child
            .kill()
            .await
            .map_err(|e| LauncherError::Launch(format!("could not stop game: {e}")))
    }

    /// Wait for exit, then remove the native directory.
    pub async fn wait(mut self) -> LauncherResult<GameExit> {
        let stdout = self
            .child
            .stdout
            .take()
            .map(|out| tokio::spawn(scan_output(out, false, self.events.clone())));
        let stderr = self
            .child
            .stderr
            .take()
            .map(|err| tokio::spawn(scan_output(err, true, self.events.clone())));

        let status = self.child.wait().await;

        let mut scan = OutputScan::default();
        for reader in [stdout, stderr].into_iter().flatten() {
            match reader.await {
                Ok(part) => scan = scan.merge(part),
                Err(err) => warn!("Output reader failed: {}", err),
            }
        }

        if let Some(dir) = &self.natives_dir {
            remove_natives_dir(dir).await;
        }

        let status = status.map_err(|e| LauncherError::Launch(format!("lost track of game process: {e}")))?;
        let state = terminal_state(&scan, status.success());
        let exit = GameExit {
            state,
            code: status.code(),
            crash_report: scan.crash_report,
            started_at: self.started_at,
            ended_at: Utc::now(),
        };
        match exit.state {
            LaunchState::Crashed => error!("Game crashed (code {:?}, report {:?})", exit.code, exit.crash_report),
            _ => info!("Game exited with code {:?}", exit.code),
        }
        Ok(exit)
    }
}
