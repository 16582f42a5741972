// ─── Classpath Builder ───
// Version jar, optional loader jar, then the merged library list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::artifact::Library;
use crate::core::platform::Platform;

/// Merge Mojang-resolved and server-declared libraries by versionless key.
/// A server library replaces the Mojang entry with the same key in place;
/// new keys are appended in declaration order. Natives never reach the
/// classpath.
pub fn merge_libraries<'a>(mojang: &'a [Library], server: &'a [Library]) -> Vec<&'a Library> {
    let mut merged: Vec<&Library> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for library in mojang.iter().chain(server.iter()) {
        if library.native {
            continue;
        }
        match positions.get(library.key.as_str()) {
            Some(&index) => {
                debug!(
                    "Library {} overridden by {:?}",
                    library.key, library.artifact.path
                );
                merged[index] = library;
            }
            None => {
                positions.insert(library.key.as_str(), merged.len());
                merged.push(library);
            }
        }
    }
    merged
}

/// Cut an entry off right after its first `.jar`.
pub fn trim_to_jar(entry: &str) -> &str {
    match entry.find(".jar") {
        Some(index) => &entry[..index + ".jar".len()],
        None => entry,
    }
}

/// Ordered classpath entries for one launch.
pub fn build_classpath(
    version_jar: &Path,
    extra_loader_jar: Option<&Path>,
    mojang: &[Library],
    server: &[Library],
) -> Vec<String> {
    let mut paths: Vec<PathBuf> = vec![version_jar.to_path_buf()];
    if let Some(jar) = extra_loader_jar {
        paths.push(jar.to_path_buf());
    }
    paths.extend(
        merge_libraries(mojang, server)
            .into_iter()
            .map(|lib| lib.artifact.path.clone()),
    );

    paths
        .iter()
        .map(|path| trim_to_jar(&safe_path_str(path)).to_string())
        .collect()
}

pub fn join_classpath(entries: &[String], platform: Platform) -> String {
    entries.join(platform.classpath_separator())
}

/// Absolute path text for launch arguments, without the `\\?\` prefix the
/// JVM cannot read on Windows.
pub fn safe_path_str(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifact::Artifact;

    fn lib(key: &str, path: &str, native: bool) -> Library {
        Library {
            artifact: Artifact::new(key, None, 1, "https://example.invalid", path),
            key: key.to_string(),
            native,
            extract_exclude: Vec::new(),
        }
    }

    #[test]
    fn server_library_overrides_mojang_with_same_key() {
        let mojang = vec![
            lib("com.example:foo", "/libs/com/example/foo/1.0/foo-1.0.jar", false),
            lib("com.example:bar", "/libs/com/example/bar/2.0/bar-2.0.jar", false),
        ];
        let server = vec![
            lib("com.example:foo", "/srv/com/example/foo/1.1/foo-1.1.jar", false),
            lib("net.modpack:core", "/srv/net/modpack/core/3/core-3.jar", false),
        ];

        let cp = build_classpath(Path::new("/versions/1.12.2/1.12.2.jar"), None, &mojang, &server);
        assert_eq!(
            cp,
            vec![
                "/versions/1.12.2/1.12.2.jar",
                "/srv/com/example/foo/1.1/foo-1.1.jar",
                "/libs/com/example/bar/2.0/bar-2.0.jar",
                "/srv/net/modpack/core/3/core-3.jar",
            ]
        );
        assert_eq!(cp.iter().filter(|e| e.contains("/foo-")).count(), 1);
    }

    #[test]
    fn loader_jar_follows_version_jar_and_natives_are_dropped() {
        let mojang = vec![
            lib("org.lwjgl:lwjgl-platform:natives-linux", "/libs/natives.jar", true),
            lib("com.mojang:patchy", "/libs/patchy-1.1.jar", false),
        ];
        let cp = build_classpath(
            Path::new("/v/1.7.10.jar"),
            Some(Path::new("/mods/forge-universal.jar")),
            &mojang,
            &[],
        );
        assert_eq!(cp, vec!["/v/1.7.10.jar", "/mods/forge-universal.jar", "/libs/patchy-1.1.jar"]);
        assert_eq!(
            join_classpath(&cp, Platform::Linux),
            "/v/1.7.10.jar:/mods/forge-universal.jar:/libs/patchy-1.1.jar"
        );
    }

    #[test]
    fn entries_end_at_jar_suffix() {
        assert_eq!(trim_to_jar("/libs/a.jar.sha1"), "/libs/a.jar");
        assert_eq!(trim_to_jar("/libs/a.jar"), "/libs/a.jar");
        assert_eq!(trim_to_jar("/libs/plain"), "/libs/plain");
    }
}
