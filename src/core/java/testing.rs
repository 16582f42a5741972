//! Test helpers for Java discovery and provisioning.

use std::path::{Path, PathBuf};

/// Write a shell script at `<root>/bin/java` that answers the settings
/// probe like a real runtime would.
#[cfg(unix)]
pub fn fake_java(root: &Path, runtime_version: &str, data_model: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = root.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let exe = bin.join("java");
    let script = format!(
        "#!/bin/sh\n\
         echo 'Property settings:' >&2\n\
         echo '    java.runtime.version = {runtime_version}' >&2\n\
         echo '    java.vendor = Test Vendor' >&2\n\
         echo '    sun.arch.data.model = {data_model}' >&2\n"
    );
    std::fs::write(&exe, script).unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
    exe
}

#[cfg(not(unix))]
pub fn fake_java(root: &Path, _runtime_version: &str, _data_model: &str) -> PathBuf {
    root.join("bin").join("javaw.exe")
}
