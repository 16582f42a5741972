use serde::{Deserialize, Serialize};

/// Host operating system family. Selected once and passed to every
/// component that resolves platform-conditional behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// OS name as it appears in version manifests (`rules[].os.name`, `natives`).
    pub fn mojang_name(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "osx",
            Platform::Linux => "linux",
        }
    }

    /// OS name used by runtime distribution APIs.
    pub fn distribution_name(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "mac",
            Platform::Linux => "linux",
        }
    }

    pub fn classpath_separator(self) -> &'static str {
        match self {
            Platform::Windows => ";",
            Platform::MacOs | Platform::Linux => ":",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mojang_name())
    }
}

/// Value substituted for `${arch}` in native classifiers.
pub fn arch_token() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "64"
    } else {
        "32"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mojang_names_match_manifest_vocabulary() {
        assert_eq!(Platform::Windows.mojang_name(), "windows");
        assert_eq!(Platform::MacOs.mojang_name(), "osx");
        assert_eq!(Platform::Linux.mojang_name(), "linux");
        assert_eq!(Platform::Windows.classpath_separator(), ";");
        assert_eq!(Platform::Linux.classpath_separator(), ":");
    }
}
