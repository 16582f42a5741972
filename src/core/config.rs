// ─── Launcher Configuration ───
// Explicit configuration value handed to every component, plus the
// store boundary used to load it and write back a resolved Java path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "Conduit";
const SETTINGS_FILE: &str = "launcher_settings.json";

/// Per-category download fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadLimits {
    pub assets: usize,
    pub libraries: usize,
    pub files: usize,
    pub java: usize,
}

impl Default for DownloadLimits {
    fn default() -> Self {
        Self {
            assets: 20,
            libraries: 5,
            files: 5,
            java: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Shared game files: versions, assets, libraries.
    pub common_dir: PathBuf,
    /// Launcher data: instances and the provisioned runtime.
    pub data_dir: PathBuf,
    pub java_executable: Option<PathBuf>,
    pub min_ram: String,
    pub max_ram: String,
    pub jvm_options: Vec<String>,
    pub game_width: u32,
    pub game_height: u32,
    pub fullscreen: bool,
    pub auto_connect: bool,
    pub launch_detached: bool,
    pub hide_launcher_on_run: bool,
    pub allow_prerelease: bool,
    pub download_limits: DownloadLimits,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            common_dir: data_dir.join("common"),
            data_dir,
            java_executable: None,
            min_ram: "2G".into(),
            max_ram: recommended_max_ram(),
            jvm_options: vec![
                "-XX:+UseConcMarkSweepGC".into(),
                "-XX:+CMSIncrementalMode".into(),
                "-XX:-UseAdaptiveSizePolicy".into(),
                "-Xmn128M".into(),
            ],
            game_width: 1280,
            game_height: 720,
            fullscreen: false,
            auto_connect: true,
            launch_detached: true,
            hide_launcher_on_run: false,
            allow_prerelease: false,
            download_limits: DownloadLimits::default(),
        }
    }
}

impl LauncherConfig {
    /// Config rooted at an explicit directory. Used by tests and embedders.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            common_dir: root.join("common"),
            data_dir: root.join("data"),
            ..Self::default()
        }
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.common_dir.join("versions")
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir().join(version_id)
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.common_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.common_dir.join("assets")
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.data_dir.join("instances")
    }

    /// Target directory for a provisioned runtime.
    pub fn runtime_dir(&self) -> PathBuf {
        self.data_dir.join("runtime").join("x64")
    }

    /// Root for per-launch scratch directories (native libraries).
    pub fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir().join(APP_DIR_NAME)
    }

    /// Reject RAM values that the JVM would not accept.
    pub fn validate(&self) -> LauncherResult<()> {
        self.heap_megabytes().map(|_| ())
    }

    /// `(min, max)` heap sizes in megabytes.
    pub fn heap_megabytes(&self) -> LauncherResult<(u64, u64)> {
        let min = parse_ram_megabytes(&self.min_ram)?;
        let max = parse_ram_megabytes(&self.max_ram)?;
        if min > max {
            return Err(LauncherError::Other(format!(
                "min RAM {} exceeds max RAM {}",
                self.min_ram, self.max_ram
            )));
        }
        Ok((min, max))
    }
}

/// Parse a JVM heap size string (`3G`, `1536M`) into megabytes.
pub fn parse_ram_megabytes(raw: &str) -> LauncherResult<u64> {
    let trimmed = raw.trim();
    let invalid = || LauncherError::Other(format!("Invalid RAM value: {raw:?}"));
    let Some(unit) = trimmed.chars().last() else {
        return Err(invalid());
    };
    let digits = &trimmed[..trimmed.len() - unit.len_utf8()];
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    match unit {
        'G' | 'g' => amount.checked_mul(1024).ok_or_else(invalid),
        'M' | 'm' => Ok(amount),
        _ => Err(invalid()),
    }
}

fn recommended_max_ram() -> String {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    let total_gib = system.total_memory() / (1024 * 1024 * 1024);
    if total_gib >= 8 {
        "3G".into()
    } else {
        "2G".into()
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Boundary to the external configuration store.
///
/// The pipeline only reads configuration before composing a launch and may
/// write back a discovered or provisioned Java executable.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> LauncherResult<LauncherConfig>;
    fn save(&self, config: &LauncherConfig) -> LauncherResult<()>;

    fn set_java_executable(&self, path: &Path) -> LauncherResult<()> {
        let mut config = self.load()?;
        config.java_executable = Some(path.to_path_buf());
        self.save(&config)
    }
}

/// Settings persisted as pretty JSON in the launcher data directory.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> LauncherResult<LauncherConfig> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {:?}, using defaults", self.path);
                return Ok(LauncherConfig::default());
            }
            Err(source) => return Err(LauncherError::io(&self.path, source)),
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!("Corrupt settings file {:?} ({}), using defaults", self.path, err);
                Ok(LauncherConfig::default())
            }
        }
    }

    fn save(&self, config: &LauncherConfig) -> LauncherResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json).map_err(|e| LauncherError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_values_parse_with_magnitude_suffix() {
        assert_eq!(parse_ram_megabytes("3G").unwrap(), 3072);
        assert_eq!(parse_ram_megabytes("1536M").unwrap(), 1536);
        assert_eq!(parse_ram_megabytes(" 2g ").unwrap(), 2048);
        assert!(parse_ram_megabytes("3GB").is_err());
        assert!(parse_ram_megabytes("").is_err());
        assert!(parse_ram_megabytes(&format!("{}G", u64::MAX)).is_err());
    }

    #[test]
    fn validate_rejects_min_above_max() {
        let mut config = LauncherConfig::rooted_at(Path::new("/tmp/conduit"));
        config.min_ram = "4G".into();
        config.max_ram = "2G".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_store_round_trips_java_executable() {
        let temp =
            std::env::temp_dir().join(format!("conduit-config-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&temp);
        let store = JsonConfigStore::new(&temp);

        let config = store.load().unwrap();
        assert!(config.java_executable.is_none());

        store.save(&LauncherConfig::rooted_at(&temp)).unwrap();
        store
            .set_java_executable(Path::new("/opt/java/bin/java"))
            .unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(
            reloaded.java_executable.as_deref(),
            Some(Path::new("/opt/java/bin/java"))
        );
        assert_eq!(reloaded.common_dir, temp.join("common"));

        let _ = std::fs::remove_dir_all(&temp);
    }
}
