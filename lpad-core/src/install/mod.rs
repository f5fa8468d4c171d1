// lpad-core/src/install/mod.rs
//! Turning a staged archive into an installed payload.
//!
//! Failure policy: if extraction or the version write fails, the whole
//! payload directory is deleted before the error is returned. The version
//! file therefore never describes a partially extracted payload; the cost
//! is a full reinstall after any failure.
pub mod extract;

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use lpad_common::config::Config;
use lpad_common::error::{LpadError, Result};
use lpad_common::paths::InstalledPayload;
use lpad_common::version::Version;
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

pub struct Installer {
    lock_path: PathBuf,
}

impl Installer {
    pub fn new(config: &Config) -> Self {
        Self::with_lock_path(config.lock_path())
    }

    pub fn with_lock_path(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
        }
    }

    /// Extracts `staged_archive` at the install root, deletes the archive and
    /// records `version` in the payload's version file.
    pub async fn install(
        &self,
        staged_archive: &Path,
        version: Version,
        payload: &InstalledPayload,
    ) -> Result<()> {
        let _lock = InstallLock::acquire(&self.lock_path)?;
        let staged = staged_archive.to_path_buf();
        let payload = payload.clone();
        tokio::task::spawn_blocking(move || install_blocking(&staged, version, &payload))
            .await
            .map_err(|e| LpadError::Install(format!("JoinError during install: {e}")))?
    }
}

fn install_blocking(staged: &Path, version: Version, payload: &InstalledPayload) -> Result<()> {
    debug!(
        "Installing {} from {} into {}",
        version,
        staged.display(),
        payload.install_root.display()
    );

    let root_name = payload
        .payload_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            LpadError::Install(format!(
                "Payload directory {} has no usable name",
                payload.payload_dir.display()
            ))
        })?;
    // Checked up front so a wrong archive leaves nothing behind.
    if !extract::contains_root(staged, root_name)? {
        return Err(LpadError::Install(format!(
            "Archive {} does not contain the payload directory '{}'",
            staged.display(),
            root_name
        )));
    }

    if let Err(e) = extract::extract_zip(staged, &payload.install_root) {
        error!("Extraction failed: {}", e);
        discard_payload(&payload.payload_dir);
        return Err(into_install_error(e));
    }

    // The archive is disposable once extracted.
    if let Err(e) = fs::remove_file(staged) {
        warn!(
            "Could not delete staged archive {}: {}",
            staged.display(),
            e
        );
    }

    if let Err(e) = write_version_file(&payload.version_file, version) {
        error!(
            "Failed to write version file {}: {}",
            payload.version_file.display(),
            e
        );
        discard_payload(&payload.payload_dir);
        return Err(into_install_error(e));
    }

    debug!("Installed version {} at {}", version, payload.payload_dir.display());
    Ok(())
}

fn into_install_error(e: LpadError) -> LpadError {
    match e {
        LpadError::Install(_) => e,
        other => LpadError::Install(other.to_string()),
    }
}

/// Writes via a sibling temp file so a crash never leaves a torn version.
pub fn write_version_file(path: &Path, version: Version) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        LpadError::Install(format!("Version file {} has no parent", path.display()))
    })?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(version.to_string().as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| LpadError::from(e.error))?;
    Ok(())
}

fn discard_payload(payload_dir: &Path) {
    if !payload_dir.exists() {
        return;
    }
    debug!("Removing partial payload at {}", payload_dir.display());
    if let Err(e) = fs::remove_dir_all(payload_dir) {
        error!(
            "Failed to remove partial payload {}: {}",
            payload_dir.display(),
            e
        );
    }
}

/// Exclusive marker held for the duration of an install.
struct InstallLock {
    path: PathBuf,
    file: Option<File>,
}

impl InstallLock {
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self {
                    path: path.to_path_buf(),
                    file: Some(file),
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(LpadError::Install(format!(
                "Another install is in progress (lock file {}). Remove it if no launcher is running.",
                path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        // Close before removing; Windows refuses to delete open files.
        drop(self.file.take());
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release install lock {}: {}", self.path.display(), e);
        }
    }
}
