mod model;
mod queue;
mod validate;

pub use model::{Artifact, ContentHash, Library, DEFAULT_NATIVE_EXCLUDE};
pub use queue::{Category, CompletionHook, Queue};
pub use validate::{collect_invalid, VALIDATION_FANOUT};
