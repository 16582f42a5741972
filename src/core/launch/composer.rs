// ─── Launch Composer ───
// Turns a manifest, configuration and account into the JVM command line
// and spawns the game.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{debug, info};

use super::classpath::{join_classpath, safe_path_str};
use crate::core::auth::GameAccount;
use crate::core::config::LauncherConfig;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Platform;
use crate::core::version::manifest::logging_config_path;
use crate::core::version::rules::argument_allowed;
use crate::core::version::{ArgumentValue, LaunchFeatures, VersionManifest};

pub const LAUNCHER_NAME: &str = "Conduit";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

pub struct LaunchComposer<'a> {
    config: &'a LauncherConfig,
    manifest: &'a VersionManifest,
    account: &'a GameAccount,
    platform: Platform,
    game_dir: PathBuf,
    natives_dir: PathBuf,
    server: Option<ServerAddress>,
}

impl<'a> LaunchComposer<'a> {
    pub fn new(
        config: &'a LauncherConfig,
        manifest: &'a VersionManifest,
        account: &'a GameAccount,
        platform: Platform,
    ) -> Self {
        Self {
            config,
            manifest,
            account,
            platform,
            game_dir: config.common_dir.clone(),
            natives_dir: config.temp_dir().join("natives"),
            server: None,
        }
    }

    pub fn game_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.game_dir = dir.into();
        self
    }

    pub fn natives_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.natives_dir = dir.into();
        self
    }

    pub fn server(mut self, server: Option<ServerAddress>) -> Self {
        self.server = server;
        self
    }

    fn placeholders(&self, classpath: &[String]) -> HashMap<&'static str, String> {
        let assets_dir = self.config.assets_dir();
        let mut values = HashMap::from([
            ("version_name", self.manifest.id.clone()),
            ("version_type", self.manifest.version_type.clone()),
            ("game_directory", safe_path_str(&self.game_dir)),
            ("assets_root", safe_path_str(&assets_dir)),
            ("game_assets", safe_path_str(&assets_dir)),
            ("assets_index_name", self.manifest.asset_index.id.clone()),
            ("user_properties", "{}".to_string()),
            ("resolution_width", self.config.game_width.to_string()),
            ("resolution_height", self.config.game_height.to_string()),
            ("natives_directory", safe_path_str(&self.natives_dir)),
            ("launcher_name", LAUNCHER_NAME.to_string()),
            ("launcher_version", LAUNCHER_VERSION.to_string()),
            ("classpath", join_classpath(classpath, self.platform)),
            ("classpath_separator", self.platform.classpath_separator().to_string()),
            ("library_directory", safe_path_str(&self.config.libraries_dir())),
        ]);
        for (key, value) in self.account.placeholders() {
            values.insert(key, value.to_string());
        }
        values
    }

    /// Expand modern argument entries whose rules pass on this platform.
    fn expand_modern(&self, entries: &[ArgumentValue], values: &HashMap<&'static str, String>) -> Vec<String> {
        let features = LaunchFeatures::default();
        let mut out = Vec::new();
        for entry in entries {
            match entry {
                ArgumentValue::Plain(arg) => out.push(substitute(arg, values)),
                ArgumentValue::Conditional { rules, value } => {
                    if argument_allowed(rules, self.platform, features) {
                        out.extend(value.values().iter().map(|v| substitute(v, values)));
                    }
                }
            }
        }
        out
    }

    fn modern_jvm_args(&self) -> Option<&[ArgumentValue]> {
        self.manifest
            .arguments
            .as_ref()
            .map(|a| a.jvm.as_slice())
            .filter(|jvm| !jvm.is_empty())
    }

    fn log4j_argument(&self) -> Option<String> {
        let logging = self.manifest.logging.as_ref()?.client.as_ref()?;
        let path = logging_config_path(&self.config.assets_dir(), &logging.file.id);
        Some(logging.argument.replace("${path}", &safe_path_str(&path)))
    }

    pub fn jvm_args(&self, classpath: &[String]) -> LauncherResult<Vec<String>> {
        let main_class = self
            .manifest
            .main_class
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| LauncherError::Launch(format!("version {} has no main class", self.manifest.id)))?;

        let (min_ram, max_ram) = self
            .config
            .heap_megabytes()
            .map_err(|e| LauncherError::Launch(e.to_string()))?;

        let mut args = Vec::new();
        if self.platform == Platform::MacOs {
            args.push(format!("-Xdock:name={LAUNCHER_NAME}"));
            let icon = self.config.assets_dir().join("icons").join("minecraft.icns");
            if icon.is_file() {
                args.push(format!("-Xdock:icon={}", safe_path_str(&icon)));
            }
        }
        args.push(format!("-Xmx{max_ram}M"));
        args.push(format!("-Xms{min_ram}M"));
        args.extend(self.config.jvm_options.iter().cloned());

        match self.modern_jvm_args() {
            Some(entries) => {
                let values = self.placeholders(classpath);
                args.extend(self.expand_modern(entries, &values));
                args.extend(self.log4j_argument());
            }
            None => {
                args.push(format!("-Djava.library.path={}", safe_path_str(&self.natives_dir)));
                args.extend(self.log4j_argument());
                args.push("-cp".into());
                args.push(join_classpath(classpath, self.platform));
            }
        }

        args.push(main_class.to_string());
        Ok(args)
    }

    pub fn game_args(&self, classpath: &[String]) -> Vec<String> {
        let values = self.placeholders(classpath);
        let mut args = match self
            .manifest
            .arguments
            .as_ref()
            .filter(|a| !a.game.is_empty())
        {
            Some(arguments) => self.expand_modern(&arguments.game, &values),
            None => self
                .manifest
                .minecraft_arguments
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(|token| substitute(token, &values))
                .collect(),
        };

        if self.config.fullscreen {
            args.push("--fullscreen".into());
            args.push("true".into());
        } else {
            args.push("--width".into());
            args.push(self.config.game_width.to_string());
            args.push("--height".into());
            args.push(self.config.game_height.to_string());
        }

        if self.config.auto_connect {
            if let Some(server) = &self.server {
                args.push("--server".into());
                args.push(server.host.clone());
                args.push("--port".into());
                args.push(server.port.to_string());
            }
        }
        args
    }

    /// Full argument vector: JVM arguments, main class, then game arguments.
    pub fn compose(&self, classpath: &[String]) -> LauncherResult<Vec<String>> {
        let mut args = self.jvm_args(classpath)?;
        args.extend(self.game_args(classpath));
        Ok(args)
    }

    pub fn command(&self, java: &Path, classpath: &[String]) -> LauncherResult<tokio::process::Command> {
        if classpath.is_empty() {
            return Err(LauncherError::Launch("empty classpath".into()));
        }
        let mut cmd = tokio::process::Command::new(java);
        cmd.args(self.compose(classpath)?);
        cmd.current_dir(&self.game_dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        configure_platform_spawn(&mut cmd, self.config.launch_detached);
        Ok(cmd)
    }

    pub async fn spawn(&self, java: &Path, classpath: &[String]) -> LauncherResult<tokio::process::Child> {
        tokio::fs::create_dir_all(&self.game_dir)
            .await
            .map_err(|e| LauncherError::io(&self.game_dir, e))?;
        let mut cmd = self.command(java, classpath)?;

        info!("Launching {} with Java {:?}", self.manifest.id, java);
        debug!("Command: {}", format_command_for_logs(cmd.as_std()));

        cmd.spawn()
            .map_err(|e| LauncherError::Launch(format!("could not start {java:?}: {e}")))
    }
}

/// Replace every `${name}` with a known value; unknown placeholders are kept.
pub fn substitute(arg: &str, values: &HashMap<&'static str, String>) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn configure_platform_spawn(cmd: &mut tokio::process::Command, detached: bool) {
    #[cfg(target_os = "windows")]
    {
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        if detached {
            cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }
        cmd.env_remove("WT_SESSION");
        cmd.env_remove("TERM");
    }
    #[cfg(unix)]
    {
        if detached {
            cmd.process_group(0);
        }
    }
    cmd.kill_on_drop(!detached);
}

fn format_command_for_logs(cmd: &std::process::Command) -> String {
    let program = shell_escape(&cmd.get_program().to_string_lossy());
    let args = cmd
        .get_args()
        .map(|arg| shell_escape(&arg.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ");

    if args.is_empty() {
        program
    } else {
        format!("{} {}", program, args)
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }
    if raw
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '='))
    {
        return raw.to_string();
    }
    format!("\"{}\"", raw.replace('"', "\\\""))
}
