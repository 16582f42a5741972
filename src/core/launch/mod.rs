pub mod classpath;
pub mod composer;
pub mod natives;
pub mod pipeline;
pub mod process;
pub mod state;
pub mod validation;

pub use classpath::{build_classpath, join_classpath, merge_libraries};
pub use composer::{LaunchComposer, ServerAddress, LAUNCHER_NAME, LAUNCHER_VERSION};
pub use natives::NativeExtractor;
pub use pipeline::{game_dir_for, LaunchPipeline, LaunchRequest};
pub use process::{GameExit, ProcessSlot, RunningGame, SlotGuard};
pub use state::LaunchState;
pub use validation::{GameValidator, ValidatedGame};
