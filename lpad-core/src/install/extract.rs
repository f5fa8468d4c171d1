// lpad-core/src/install/extract.rs
use std::fs::{self, File};
use std::io;
use std::path::Path;

use lpad_common::error::{LpadError, Result};
use tracing::debug;
use zip::ZipArchive;

/// Whether any entry of the zip at `archive_path` lives under the
/// top-level directory `root_name`.
pub fn contains_root(archive_path: &Path, root_name: &str) -> Result<bool> {
    let file = File::open(archive_path).map_err(|e| {
        LpadError::Install(format!(
            "Failed to open archive {}: {e}",
            archive_path.display()
        ))
    })?;
    let archive = ZipArchive::new(file).map_err(|e| {
        LpadError::Install(format!(
            "Failed to read ZIP {}: {e}",
            archive_path.display()
        ))
    })?;
    let found = archive.file_names().any(|name| {
        Path::new(name)
            .components()
            .next()
            .is_some_and(|first| first.as_os_str() == root_name)
    });
    Ok(found)
}

/// Extracts every entry of the zip at `archive_path` under `target_dir`,
/// overwriting files that already exist. Entries whose names would escape
/// `target_dir` are rejected.
pub fn extract_zip(archive_path: &Path, target_dir: &Path) -> Result<usize> {
    debug!(
        "Extracting '{}' to '{}'",
        archive_path.display(),
        target_dir.display()
    );
    fs::create_dir_all(target_dir)?;

    let file = File::open(archive_path).map_err(|e| {
        LpadError::Install(format!(
            "Failed to open archive {}: {e}",
            archive_path.display()
        ))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        LpadError::Install(format!(
            "Failed to read ZIP {}: {e}",
            archive_path.display()
        ))
    })?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| LpadError::Install(format!("Failed to access ZIP entry {i}: {e}")))?;
        let relative = entry.enclosed_name().ok_or_else(|| {
            LpadError::Install(format!("Unsafe path in ZIP entry '{}'", entry.name()))
        })?;
        let outpath = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| {
                LpadError::Install(format!("Failed to create {}: {e}", outpath.display()))
            })?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LpadError::Install(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let mut outfile = File::create(&outpath).map_err(|e| {
            LpadError::Install(format!("Failed to create {}: {e}", outpath.display()))
        })?;
        io::copy(&mut entry, &mut outfile).map_err(|e| {
            LpadError::Install(format!(
                "Failed to extract '{}' to {}: {e}",
                entry.name(),
                outpath.display()
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                if let Err(e) = fs::set_permissions(&outpath, fs::Permissions::from_mode(mode)) {
                    tracing::warn!("Failed to set permissions on {}: {}", outpath.display(), e);
                }
            }
        }
    }

    debug!(
        "Extracted {} entries from {}",
        archive.len(),
        archive_path.display()
    );
    Ok(archive.len())
}
