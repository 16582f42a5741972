pub mod index;
pub mod manifest;
pub mod rules;

pub use index::{VersionEntry, VersionIndex};
pub use manifest::{
    ArgumentValue, Arguments, AssetIndexInfo, DownloadInfo, LibraryDescriptor, ManifestLoader,
    VersionManifest,
};
pub use rules::{LaunchFeatures, Rule, RuleAction};
