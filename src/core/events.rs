// ─── Launcher Events ───
// Progress, completion and lifecycle signals. Components hold an
// `EventSink`; the caller owns the receiving end of the channel.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::launch::LaunchState;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    /// Bytes transferred across the categories being processed.
    Download,
    /// Asset entries validated.
    Assets,
    /// Archives unpacked from the extraction backlog.
    Extract,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPhase {
    Version,
    Assets,
    Libraries,
    Files,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LauncherEvent {
    Progress {
        kind: ProgressKind,
        value: u64,
        total: u64,
        percent: Option<u8>,
    },
    PhaseComplete {
        phase: ValidationPhase,
    },
    StateChanged {
        state: LaunchState,
    },
    /// All requested download categories and the extraction backlog are done.
    Complete,
    Error {
        context: String,
        message: String,
    },
    GameOutput {
        line: String,
        stderr: bool,
    },
}

impl LauncherEvent {
    pub fn progress(kind: ProgressKind, value: u64, total: u64) -> Self {
        let percent = (total > 0).then(|| ((value.min(total) * 100) / total) as u8);
        LauncherEvent::Progress {
            kind,
            value,
            total,
            percent,
        }
    }
}

/// Sending half of the event channel. Cheap to clone.
///
/// A dropped receiver is not an error: events are simply discarded.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<LauncherEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LauncherEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: LauncherEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
