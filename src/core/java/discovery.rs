// ─── Java Discovery ───
// One strategy per platform, chosen once by `discovery_for`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::paths::ensure_install_root;
use super::validate::{rank, validate_root, JavaCandidate};
use crate::core::platform::Platform;

#[async_trait]
pub trait JavaDiscovery: Send + Sync {
    fn platform(&self) -> Platform;

    /// Installation roots worth probing. Order does not matter.
    async fn candidate_roots(&self) -> Vec<PathBuf>;

    /// Probe every root and return the best valid runtime, if any.
    async fn discover(&self) -> Option<JavaCandidate> {
        let platform = self.platform();
        let mut seen = HashSet::new();
        let mut valid = Vec::new();

        for root in self.candidate_roots().await {
            if !seen.insert(root.clone()) {
                continue;
            }
            let candidate = validate_root(&root, platform).await;
            if candidate.valid {
                valid.push(candidate);
            }
        }

        rank(&mut valid);
        let best = valid.into_iter().next();
        match &best {
            Some(c) => info!("Selected Java {:?} ({:?})", c.executable, c.version),
            None => info!("No compatible Java runtime found on this machine"),
        }
        best
    }
}

pub fn discovery_for(platform: Platform, runtime_dir: &Path) -> Box<dyn JavaDiscovery> {
    match platform {
        Platform::Windows => Box::new(WindowsDiscovery::new(runtime_dir)),
        Platform::MacOs => Box::new(MacDiscovery::new(runtime_dir)),
        Platform::Linux => Box::new(LinuxDiscovery::new(runtime_dir)),
    }
}

fn java_home(platform: Platform) -> Option<PathBuf> {
    std::env::var_os("JAVA_HOME")
        .filter(|v| !v.is_empty())
        .map(|v| ensure_install_root(Path::new(&v), platform))
}

/// Immediate subdirectories of `dir`; empty when it cannot be read.
async fn child_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return out,
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.is_dir() {
            out.push(path);
        }
    }
    out
}

// ── Windows ─────────────────────────────────────────

pub struct WindowsDiscovery {
    runtime_dir: PathBuf,
    program_files: PathBuf,
}

const WINDOWS_REGISTRY_KEYS: [&str; 2] = [
    r"HKEY_LOCAL_MACHINE\SOFTWARE\JavaSoft\Java Runtime Environment",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\JavaSoft\Java Development Kit",
];

const WINDOWS_VENDOR_DIRS: [&str; 4] = ["Java", "AdoptOpenJDK", "Eclipse Adoptium", "Eclipse Foundation"];

impl WindowsDiscovery {
    pub fn new(runtime_dir: &Path) -> Self {
        let program_files = std::env::var_os("ProgramFiles")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));
        Self {
            runtime_dir: runtime_dir.to_path_buf(),
            program_files,
        }
    }

    async fn registry_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        for key in WINDOWS_REGISTRY_KEYS {
            let mut cmd = tokio::process::Command::new("reg");
            cmd.args(["query", key, "/s"]);
            #[cfg(target_os = "windows")]
            {
                const CREATE_NO_WINDOW: u32 = 0x0800_0000;
                cmd.creation_flags(CREATE_NO_WINDOW);
            }
            match cmd.output().await {
                Ok(output) if output.status.success() => {
                    roots.extend(parse_registry_java_homes(&String::from_utf8_lossy(&output.stdout)));
                }
                Ok(_) => debug!("Registry key {} not present", key),
                Err(err) => debug!("reg query failed for {}: {}", key, err),
            }
        }
        roots
    }
}

/// Pull `JavaHome` values out of `reg query /s` output, keeping only
/// subkeys for the 1.8 product line.
pub fn parse_registry_java_homes(output: &str) -> Vec<PathBuf> {
    let mut homes = Vec::new();
    let mut in_java8_key = false;
    for line in output.lines() {
        if line.starts_with("HKEY_") {
            in_java8_key = line
                .trim_end()
                .rsplit('\\')
                .next()
                .map(|leaf| leaf.starts_with("1.8"))
                .unwrap_or(false);
            continue;
        }
        if !in_java8_key {
            continue;
        }
        let mut fields = line.trim().splitn(3, "    ");
        if let (Some("JavaHome"), Some(_kind), Some(value)) = (fields.next(), fields.next(), fields.next()) {
            homes.push(PathBuf::from(value.trim()));
        }
    }
    homes
}

#[async_trait]
impl JavaDiscovery for WindowsDiscovery {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    #[instrument(skip(self))]
    async fn candidate_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.registry_roots().await;
        for vendor in WINDOWS_VENDOR_DIRS {
            roots.extend(child_dirs(&self.program_files.join(vendor)).await);
        }
        roots.extend(java_home(Platform::Windows));
        roots.extend(child_dirs(&self.runtime_dir).await);
        roots
    }
}

// ── macOS ───────────────────────────────────────────

pub struct MacDiscovery {
    runtime_dir: PathBuf,
}

const MAC_JVM_DIR: &str = "/Library/Java/JavaVirtualMachines";
const MAC_PLUGIN_ROOT: &str = "/Library/Internet Plug-Ins/JavaAppletPlugin.plugin";

impl MacDiscovery {
    pub fn new(runtime_dir: &Path) -> Self {
        Self {
            runtime_dir: runtime_dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl JavaDiscovery for MacDiscovery {
    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    #[instrument(skip(self))]
    async fn candidate_roots(&self) -> Vec<PathBuf> {
        let mut roots = child_dirs(Path::new(MAC_JVM_DIR)).await;
        roots.push(PathBuf::from(MAC_PLUGIN_ROOT));
        roots.extend(java_home(Platform::MacOs));
        roots.extend(child_dirs(&self.runtime_dir).await);
        roots
    }
}

// ── Linux ───────────────────────────────────────────

pub struct LinuxDiscovery {
    runtime_dir: PathBuf,
    jvm_dir: PathBuf,
    use_java_home: bool,
}

impl LinuxDiscovery {
    pub fn new(runtime_dir: &Path) -> Self {
        Self {
            runtime_dir: runtime_dir.to_path_buf(),
            jvm_dir: PathBuf::from("/usr/lib/jvm"),
            use_java_home: true,
        }
    }

    /// Search only the given directories, ignoring `JAVA_HOME`.
    pub fn with_search_dirs(jvm_dir: &Path, runtime_dir: &Path) -> Self {
        Self {
            runtime_dir: runtime_dir.to_path_buf(),
            jvm_dir: jvm_dir.to_path_buf(),
            use_java_home: false,
        }
    }
}

#[async_trait]
impl JavaDiscovery for LinuxDiscovery {
    fn platform(&self) -> Platform {
        Platform::Linux
    }

    #[instrument(skip(self))]
    async fn candidate_roots(&self) -> Vec<PathBuf> {
        let mut roots = child_dirs(&self.jvm_dir).await;
        if self.use_java_home {
            roots.extend(java_home(Platform::Linux));
        }
        roots.extend(child_dirs(&self.runtime_dir).await);
        roots
    }
}
