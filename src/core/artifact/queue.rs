use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::model::Artifact;
use crate::core::error::LauncherResult;

/// Download categories, each tracked by its own [`Queue`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Assets,
    Libraries,
    Files,
    Java,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Assets,
        Category::Libraries,
        Category::Files,
        Category::Java,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Assets => "assets",
            Category::Libraries => "libraries",
            Category::Files => "files",
            Category::Java => "java",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook run once per artifact after it has been written and verified.
/// Runs on the blocking pool, so it may do synchronous file work.
pub type CompletionHook = Arc<dyn Fn(&Artifact) -> LauncherResult<()> + Send + Sync>;

/// Pending downloads for one category.
///
/// `total_size` always equals the sum of the member sizes.
#[derive(Default, Clone)]
pub struct Queue {
    artifacts: Vec<Artifact>,
    total_size: u64,
    callback: Option<CompletionHook>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: CompletionHook) -> Self {
        Self {
            callback: Some(callback),
            ..Self::default()
        }
    }

    pub fn push(&mut self, artifact: Artifact) {
        self.total_size += artifact.size;
        self.artifacts.push(artifact);
    }

    pub fn set_callback(&mut self, callback: CompletionHook) {
        self.callback = Some(callback);
    }

    pub fn callback(&self) -> Option<&CompletionHook> {
        self.callback.as_ref()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Reset to an empty tracker, dropping members and callback.
    pub fn clear(&mut self) {
        *self = Queue::default();
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("len", &self.artifacts.len())
            .field("total_size", &self.total_size)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
