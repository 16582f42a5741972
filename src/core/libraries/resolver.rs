use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::core::artifact::{
    collect_invalid, Artifact, Library, Queue, DEFAULT_NATIVE_EXCLUDE, VALIDATION_FANOUT,
};
use crate::core::maven::{MavenCoordinate, MOJANG_LIBRARIES};
use crate::core::platform::{arch_token, Platform};
use crate::core::version::manifest::DownloadInfo;
use crate::core::version::rules::library_allowed;
use crate::core::version::LibraryDescriptor;

/// Turns manifest library descriptors into the libraries this platform needs.
#[derive(Debug, Clone)]
pub struct LibraryResolver {
    libraries_dir: PathBuf,
    platform: Platform,
    fanout: usize,
}

impl LibraryResolver {
    pub fn new(libraries_dir: PathBuf, platform: Platform) -> Self {
        Self {
            libraries_dir,
            platform,
            fanout: VALIDATION_FANOUT,
        }
    }

    /// Apply platform rules and pick the plain or native-classifier artifact.
    pub fn select(&self, descriptors: &[LibraryDescriptor]) -> Vec<Library> {
        descriptors.iter().filter_map(|d| self.select_one(d)).collect()
    }

    fn select_one(&self, descriptor: &LibraryDescriptor) -> Option<Library> {
        if !library_allowed(
            descriptor.rules.as_deref(),
            descriptor.natives.as_ref(),
            self.platform,
        ) {
            debug!("Library {} excluded on {}", descriptor.name, self.platform);
            return None;
        }

        let mut coordinate = match MavenCoordinate::parse(&descriptor.name) {
            Ok(c) => c,
            Err(err) => {
                warn!("Skipping library: {}", err);
                return None;
            }
        };

        let (info, native) = match &descriptor.natives {
            Some(natives) => {
                // Rules allowed it, but there may still be no build for this OS.
                let template = natives.get(self.platform.mojang_name())?;
                let classifier = template.replace("${arch}", arch_token());
                let info = descriptor
                    .downloads
                    .as_ref()
                    .and_then(|d| d.classifiers.as_ref())
                    .and_then(|c| c.get(&classifier))
                    .cloned();
                coordinate.classifier = Some(classifier);
                (info, true)
            }
            None => (
                descriptor
                    .downloads
                    .as_ref()
                    .and_then(|d| d.artifact.clone()),
                false,
            ),
        };

        let artifact = self.artifact_for(&coordinate, info, descriptor.url.as_deref());
        let extract_exclude = descriptor
            .extract
            .as_ref()
            .map(|e| e.exclude.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_NATIVE_EXCLUDE.to_string()]);

        Some(Library {
            artifact,
            key: coordinate.versionless_key(),
            native,
            extract_exclude,
        })
    }

    fn artifact_for(
        &self,
        coordinate: &MavenCoordinate,
        info: Option<DownloadInfo>,
        repository: Option<&str>,
    ) -> Artifact {
        match info {
            Some(info) => {
                let relative = info
                    .path
                    .as_ref()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| coordinate.relative_path());
                Artifact::new(
                    coordinate.to_string(),
                    info.content_hash(),
                    info.size,
                    info.url,
                    self.libraries_dir.join(relative),
                )
            }
            // No download block: repository layout, trusted once present.
            None => Artifact::new(
                coordinate.to_string(),
                None,
                0,
                coordinate.url(repository.unwrap_or(MOJANG_LIBRARIES)),
                self.libraries_dir.join(coordinate.relative_path()),
            ),
        }
    }

    /// Select libraries, validate them locally and enqueue the ones that
    /// need downloading. Returns every selected library.
    pub async fn resolve(&self, descriptors: &[LibraryDescriptor], queue: &mut Queue) -> Vec<Library> {
        let libraries = self.select(descriptors);
        let artifacts = libraries.iter().map(|l| l.artifact.clone()).collect();
        let invalid = collect_invalid(artifacts, self.fanout, |_| {}).await;

        info!(
            "Libraries: {} of {} selected for {}, {} need download",
            libraries.len(),
            descriptors.len(),
            self.platform,
            invalid.len()
        );
        for artifact in invalid {
            queue.push(artifact);
        }
        libraries
    }
}
