use std::path::{Path, PathBuf};

use crate::core::platform::Platform;

/// Executable used to run the game on each platform.
pub fn executable_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Windows => "javaw.exe",
        Platform::MacOs | Platform::Linux => "java",
    }
}

/// Convert an installation root to its launch executable.
///
/// - Windows: `<root>/bin/javaw.exe`
/// - macOS:   `<root>/Contents/Home/bin/java`
/// - Linux:   `<root>/bin/java`
pub fn java_executable_from_root(root: &Path, platform: Platform) -> PathBuf {
    let home = match platform {
        Platform::MacOs => root.join("Contents").join("Home"),
        Platform::Windows | Platform::Linux => root.to_path_buf(),
    };
    home.join("bin").join(executable_name(platform))
}

/// Whether `path` ends in `bin/<platform executable>`.
pub fn has_executable_suffix(path: &Path, platform: Platform) -> bool {
    let file_matches = path
        .file_name()
        .map(|n| n.to_string_lossy().eq_ignore_ascii_case(executable_name(platform)))
        .unwrap_or(false);
    let in_bin = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n == "bin")
        .unwrap_or(false);
    file_matches && in_bin
}

/// Normalize a user-supplied home (e.g. `JAVA_HOME`) to the root layout
/// expected by [`java_executable_from_root`].
pub fn ensure_install_root(path: &Path, platform: Platform) -> PathBuf {
    let mut root = path.to_path_buf();
    if root.file_name().map(|n| n == "bin").unwrap_or(false) {
        root.pop();
    }
    if platform == Platform::MacOs && root.ends_with("Contents/Home") {
        root.pop();
        root.pop();
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executable_layout_per_platform() {
        let root = Path::new("/jvm/jre8");
        assert_eq!(
            java_executable_from_root(root, Platform::Linux),
            PathBuf::from("/jvm/jre8/bin/java")
        );
        assert_eq!(
            java_executable_from_root(root, Platform::MacOs),
            PathBuf::from("/jvm/jre8/Contents/Home/bin/java")
        );
        assert!(java_executable_from_root(root, Platform::Windows).ends_with("bin/javaw.exe"));
    }

    #[test]
    fn suffix_check() {
        assert!(has_executable_suffix(Path::new("/x/bin/java"), Platform::Linux));
        assert!(!has_executable_suffix(Path::new("/x/java"), Platform::Linux));
        assert!(!has_executable_suffix(Path::new("/x/bin/java"), Platform::Windows));
        assert!(has_executable_suffix(Path::new("C/jre/bin/javaw.exe"), Platform::Windows));
    }

    #[test]
    fn mac_java_home_is_reduced_to_bundle_root() {
        let home = Path::new("/Library/Java/JavaVirtualMachines/jdk1.8.0_152.jdk/Contents/Home");
        assert_eq!(
            ensure_install_root(home, Platform::MacOs),
            PathBuf::from("/Library/Java/JavaVirtualMachines/jdk1.8.0_152.jdk")
        );
        assert_eq!(
            ensure_install_root(Path::new("/usr/lib/jvm/java-8/bin"), Platform::Linux),
            PathBuf::from("/usr/lib/jvm/java-8")
        );
    }
}
