// ─── Archive Extraction ───
// Synchronous helpers; async callers run them on the blocking pool.

use std::path::{Component, Path};

use flate2::read::GzDecoder;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    /// First path component of the first entry, e.g. `jdk8u402-b06`.
    pub top_level: Option<String>,
}

pub fn is_tar_gz(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

fn first_component(path: &Path) -> Option<String> {
    path.components().find_map(|c| match c {
        Component::Normal(part) => Some(part.to_string_lossy().to_string()),
        _ => None,
    })
}

/// Extract a ZIP archive into `dest`, skipping any entry whose name contains
/// one of the `exclude` fragments.
pub fn extract_zip(archive: &Path, dest: &Path, exclude: &[String]) -> LauncherResult<ExtractSummary> {
    let file = std::fs::File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;

    let mut summary = ExtractSummary::default();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let name = entry.name().to_string();
        if exclude.iter().any(|fragment| name.contains(fragment.as_str())) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping unsafe zip entry {:?} in {:?}", name, archive);
            continue;
        };
        if summary.top_level.is_none() {
            summary.top_level = first_component(&relative);
        }

        let out_path = dest.join(&relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = std::fs::File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;
        summary.files += 1;
    }

    Ok(summary)
}

/// Decompress and unpack a tar+gzip archive in one streaming pass.
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> LauncherResult<ExtractSummary> {
    let file = std::fs::File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;

    let mut summary = ExtractSummary::default();
    let entries = tar.entries().map_err(|e| LauncherError::io(archive, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| LauncherError::io(archive, e))?;
        if summary.top_level.is_none() {
            let path = entry.path().map_err(|e| LauncherError::io(archive, e))?;
            summary.top_level = first_component(&path);
        }
        let is_file = entry.header().entry_type().is_file();
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| LauncherError::io(dest, e))?;
        if unpacked && is_file {
            summary.files += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;
    use std::path::Path;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap();
    }

    pub fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, body) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *body).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{write_tar_gz, write_zip};
    use super::*;
    use crate::core::testutil::scratch_dir;

    #[test]
    fn zip_extraction_honors_exclusions() {
        let dir = scratch_dir("archive-zip");
        let archive = dir.join("natives.jar");
        write_zip(
            &archive,
            &[
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0"),
                ("liblwjgl.so", b"elf"),
                ("sub/libopenal.so", b"elf"),
            ],
        );

        let out = dir.join("out");
        let summary = extract_zip(&archive, &out, &["META-INF/".to_string()]).unwrap();
        assert_eq!(summary.files, 2);
        assert!(out.join("liblwjgl.so").is_file());
        assert!(out.join("sub").join("libopenal.so").is_file());
        assert!(!out.join("META-INF").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn tar_gz_reports_top_level_directory() {
        let dir = scratch_dir("archive-tgz");
        let archive = dir.join("runtime.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("jdk8u402/bin/java", b"#!/bin/sh"),
                ("jdk8u402/release", b"JAVA_VERSION=\"1.8.0_402\""),
            ],
        );

        assert!(is_tar_gz(&archive));
        assert!(!is_tar_gz(&dir.join("runtime.zip")));

        let summary = extract_tar_gz(&archive, &dir).unwrap();
        assert_eq!(summary.top_level.as_deref(), Some("jdk8u402"));
        assert_eq!(summary.files, 2);
        assert!(dir.join("jdk8u402").join("bin").join("java").is_file());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
