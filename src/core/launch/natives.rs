// ─── Native Extractor ───
// Each launch unpacks its native classifiers into a fresh directory under
// the launcher temp root. The directory is removed once the game exits.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::archive;
use crate::core::artifact::Library;
use crate::core::downloader::ExtractionJob;
use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone)]
pub struct NativeExtractor {
    dir: PathBuf,
}

impl NativeExtractor {
    /// Create `<temp_root>/natives/<uuid>`.
    pub async fn prepare(temp_root: &Path) -> LauncherResult<Self> {
        let dir = temp_root
            .join("natives")
            .join(Uuid::new_v4().simple().to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| LauncherError::io(&dir, e))?;
        debug!("Native directory for this launch: {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// One extraction job per native library, for the download backlog.
    pub fn jobs(&self, libraries: &[Library]) -> Vec<ExtractionJob> {
        libraries
            .iter()
            .filter(|lib| lib.native)
            .map(|lib| ExtractionJob {
                archive: lib.artifact.path.clone(),
                destination: self.dir.clone(),
                exclude: lib.extract_exclude.clone(),
            })
            .collect()
    }

    /// Unpack every native library now. A failing archive is logged and
    /// skipped; the count of successful archives is returned.
    pub async fn extract(&self, libraries: &[Library]) -> usize {
        let mut extracted = 0;
        for job in self.jobs(libraries) {
            let archive_path = job.archive.clone();
            let result = tokio::task::spawn_blocking(move || {
                archive::extract_zip(&job.archive, &job.destination, &job.exclude)
            })
            .await;
            match result {
                Ok(Ok(summary)) => {
                    debug!("Extracted {} native files from {:?}", summary.files, archive_path);
                    extracted += 1;
                }
                Ok(Err(err)) => warn!("Native extraction failed for {:?}: {}", archive_path, err),
                Err(err) => warn!("Native extraction task for {:?} panicked: {}", archive_path, err),
            }
        }
        extracted
    }

    /// Best-effort removal of the per-launch directory.
    pub async fn cleanup(&self) {
        remove_natives_dir(&self.dir).await;
    }
}

pub async fn remove_natives_dir(dir: &Path) {
    if let Err(err) = tokio::fs::remove_dir_all(dir).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove native directory {:?}: {}", dir, err);
        }
    }
}
