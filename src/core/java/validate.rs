// ─── Binary Validation ───
// Runs a candidate with `-XshowSettings:properties -version` and decides
// whether it can host the game.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::paths::{has_executable_suffix, java_executable_from_root};
use super::version::JavaVersion;
use crate::core::platform::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaCandidate {
    pub root: PathBuf,
    pub executable: PathBuf,
    pub version: Option<JavaVersion>,
    pub is_64bit: bool,
    pub vendor: Option<String>,
    pub valid: bool,
}

impl JavaCandidate {
    fn rejected(root: &Path, executable: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            executable: executable.to_path_buf(),
            version: None,
            is_64bit: false,
            vendor: None,
            valid: false,
        }
    }

    fn is_jdk_path(&self) -> bool {
        self.executable
            .to_string_lossy()
            .to_ascii_lowercase()
            .contains("jdk")
    }
}

/// The properties the launcher cares about from the settings dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JavaProperties {
    pub arch_data_model: Option<String>,
    pub runtime_version: Option<String>,
    pub vendor: Option<String>,
}

pub fn parse_properties(output: &str) -> JavaProperties {
    let mut props = JavaProperties::default();
    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once(" = ") else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "sun.arch.data.model" => props.arch_data_model = Some(value),
            "java.runtime.version" => props.runtime_version = Some(value),
            "java.vendor" => props.vendor = Some(value),
            _ => {}
        }
    }
    props
}

/// Judge a candidate from its parsed properties.
pub fn evaluate(root: &Path, executable: &Path, props: JavaProperties) -> JavaCandidate {
    let is_64bit = props.arch_data_model.as_deref() == Some("64");
    let version = props.runtime_version.as_deref().and_then(JavaVersion::parse);
    let version_ok = version.map(|v| v.is_supported()).unwrap_or(false);

    JavaCandidate {
        root: root.to_path_buf(),
        executable: executable.to_path_buf(),
        version,
        is_64bit,
        vendor: props.vendor,
        valid: is_64bit && version_ok,
    }
}

/// Validate an installation root. Never fails: problems produce an
/// invalid candidate.
pub async fn validate_root(root: &Path, platform: Platform) -> JavaCandidate {
    let executable = java_executable_from_root(root, platform);
    validate_executable(root, &executable, platform).await
}

pub async fn validate_executable(root: &Path, executable: &Path, platform: Platform) -> JavaCandidate {
    if !has_executable_suffix(executable, platform) || !executable.is_file() {
        return JavaCandidate::rejected(root, executable);
    }

    let mut cmd = tokio::process::Command::new(executable);
    cmd.arg("-XshowSettings:properties").arg("-version");
    #[cfg(target_os = "windows")]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let output = match cmd.output().await {
        Ok(output) => output,
        Err(err) => {
            debug!("Could not run {:?}: {}", executable, err);
            return JavaCandidate::rejected(root, executable);
        }
    };

    // The settings dump goes to stderr on most builds.
    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    let candidate = evaluate(root, executable, parse_properties(&text));
    debug!(
        "Probed {:?}: version={:?} 64bit={} valid={}",
        executable, candidate.version, candidate.is_64bit, candidate.valid
    );
    candidate
}

/// Best first: newer version, then a JRE path over a JDK path.
pub fn compare_candidates(a: &JavaCandidate, b: &JavaCandidate) -> Ordering {
    b.version
        .cmp(&a.version)
        .then_with(|| a.is_jdk_path().cmp(&b.is_jdk_path()))
}

pub fn rank(candidates: &mut [JavaCandidate]) {
    candidates.sort_by(compare_candidates);
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "Property settings:
    awt.toolkit = sun.awt.X11.XToolkit
    java.library.path = /usr/java/packages/lib/amd64
        /usr/lib64
    java.runtime.version = 1.8.0_152-b16
    java.vendor = Oracle Corporation
    sun.arch.data.model = 64

java version \"1.8.0_152\"";

    fn candidate(path: &str, update: u32, build: u32) -> JavaCandidate {
        JavaCandidate {
            root: PathBuf::from(path),
            executable: PathBuf::from(path).join("bin/java"),
            version: Some(JavaVersion::Legacy {
                major: 8,
                update,
                build,
            }),
            is_64bit: true,
            vendor: None,
            valid: true,
        }
    }

    #[test]
    fn parses_settings_dump() {
        let props = parse_properties(DUMP);
        assert_eq!(props.arch_data_model.as_deref(), Some("64"));
        assert_eq!(props.runtime_version.as_deref(), Some("1.8.0_152-b16"));
        assert_eq!(props.vendor.as_deref(), Some("Oracle Corporation"));

        let c = evaluate(Path::new("/jre"), Path::new("/jre/bin/java"), props);
        assert!(c.valid);
    }

    #[test]
    fn rejects_32bit_and_unsupported_versions() {
        let mut props = parse_properties(DUMP);
        props.arch_data_model = Some("32".into());
        assert!(!evaluate(Path::new("/a"), Path::new("/a/bin/java"), props).valid);

        let mut props = parse_properties(DUMP);
        props.runtime_version = Some("1.8.0_45-b14".into());
        assert!(!evaluate(Path::new("/a"), Path::new("/a/bin/java"), props).valid);

        let mut props = parse_properties(DUMP);
        props.vendor = None;
        assert!(evaluate(Path::new("/a"), Path::new("/a/bin/java"), props).valid);
    }

    #[test]
    fn ranking_prefers_newer_then_jre() {
        let mut list = vec![
            candidate("/jvm/jdk-a", 60, 0),
            candidate("/jvm/jre-b", 50, 9),
            candidate("/jvm/jdk-c", 60, 1),
            candidate("/jvm/jre-d", 60, 1),
        ];
        rank(&mut list);
        let order: Vec<_> = list.iter().map(|c| c.root.to_string_lossy().to_string()).collect();
        assert_eq!(order, vec!["/jvm/jre-d", "/jvm/jdk-c", "/jvm/jdk-a", "/jvm/jre-b"]);
    }

    #[tokio::test]
    async fn wrong_suffix_or_missing_binary_is_invalid() {
        let c = validate_executable(Path::new("/nope"), Path::new("/nope/java"), Platform::Linux).await;
        assert!(!c.valid);
        let c = validate_root(Path::new("/definitely/not/here"), Platform::Linux).await;
        assert!(!c.valid);
        assert_eq!(c.executable, PathBuf::from("/definitely/not/here/bin/java"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probes_a_real_process() {
        use crate::core::java::testing::fake_java;
        use crate::core::testutil::scratch_dir;

        let dir = scratch_dir("validate-probe");
        let root = dir.join("jre8");
        fake_java(&root, "1.8.0_152-b16", "64");

        let c = validate_root(&root, Platform::Linux).await;
        assert!(c.valid, "{c:?}");
        assert_eq!(c.version.map(|v| v.major()), Some(8));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
