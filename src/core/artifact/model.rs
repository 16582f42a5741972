use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::core::error::{LauncherError, LauncherResult};

const HASH_BUFFER: usize = 64 * 1024;

/// Expected content hash of a downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "algorithm", content = "value", rename_all = "lowercase")]
pub enum ContentHash {
    Sha1(String),
    Sha256(String),
}

impl ContentHash {
    pub fn expected(&self) -> &str {
        match self {
            ContentHash::Sha1(h) | ContentHash::Sha256(h) => h,
        }
    }

    /// Hash a file by streaming it through the digest.
    pub fn compute(&self, path: &Path) -> LauncherResult<String> {
        let file = std::fs::File::open(path).map_err(|e| LauncherError::io(path, e))?;
        match self {
            ContentHash::Sha1(_) => digest_reader::<Sha1>(file, path),
            ContentHash::Sha256(_) => digest_reader::<Sha256>(file, path),
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self.compute(path) {
            Ok(actual) => actual.eq_ignore_ascii_case(self.expected()),
            Err(_) => false,
        }
    }

    /// Like [`matches`](Self::matches) but reports the mismatch as an error.
    pub fn verify(&self, path: &Path) -> LauncherResult<()> {
        let actual = self.compute(path)?;
        if actual.eq_ignore_ascii_case(self.expected()) {
            Ok(())
        } else {
            Err(LauncherError::Integrity {
                path: path.to_path_buf(),
                expected: self.expected().to_string(),
                actual,
            })
        }
    }
}

fn digest_reader<D: Digest>(mut reader: impl Read, path: &Path) -> LauncherResult<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; HASH_BUFFER];
    loop {
        let n = reader.read(&mut buf).map_err(|e| LauncherError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// A single downloadable file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    /// `None` means a local copy is trusted as soon as it exists.
    pub hash: Option<ContentHash>,
    pub size: u64,
    pub url: String,
    pub path: PathBuf,
}

impl Artifact {
    pub fn new(
        id: impl Into<String>,
        hash: Option<ContentHash>,
        size: u64,
        url: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            hash,
            size,
            url: url.into(),
            path: path.into(),
        }
    }

    /// Whether the destination already holds the expected content.
    pub fn validate_local(&self) -> bool {
        if !self.path.is_file() {
            return false;
        }
        match &self.hash {
            None => true,
            Some(hash) => hash.matches(&self.path),
        }
    }
}

/// A library artifact that survived rule evaluation for this platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub artifact: Artifact,
    /// Versionless identity, see [`MavenCoordinate::versionless_key`].
    ///
    /// [`MavenCoordinate::versionless_key`]: crate::core::maven::MavenCoordinate::versionless_key
    pub key: String,
    /// Set for native-classifier archives that must be unpacked before launch.
    pub native: bool,
    /// Entry-name fragments skipped during native extraction.
    pub extract_exclude: Vec<String>,
}

pub const DEFAULT_NATIVE_EXCLUDE: &str = "META-INF/";

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("conduit-artifact-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn hashes_stream_known_vectors() {
        let dir = temp_dir("vectors");
        let file = dir.join("abc.txt");
        std::fs::write(&file, b"abc").unwrap();

        let sha1 = ContentHash::Sha1("a9993e364706816aba3e25717850c26c9cd0d89d".into());
        let sha256 = ContentHash::Sha256(
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD".into(),
        );
        assert!(sha1.matches(&file));
        assert!(sha256.matches(&file));
        assert!(sha1.verify(&file).is_ok());

        let wrong = ContentHash::Sha1("0000".into());
        assert!(matches!(
            wrong.verify(&file),
            Err(LauncherError::Integrity { .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn validate_local_trusts_unhashed_files() {
        let dir = temp_dir("trust");
        let path = dir.join("options.txt");
        let artifact = Artifact::new("options", None, 3, "http://unused", &path);
        assert!(!artifact.validate_local());

        std::fs::write(&path, b"xyz").unwrap();
        assert!(artifact.validate_local());

        let hashed = Artifact {
            hash: Some(ContentHash::Sha1("deadbeef".into())),
            ..artifact
        };
        assert!(!hashed.validate_local());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
