// lpad-common/src/paths.rs
use std::path::{Path, PathBuf};

use crate::config::Config;

/// The user-chosen root under which the payload is extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLocation {
    pub root: PathBuf,
    /// File in the launcher directory that remembers `root` across runs.
    pub marker_path: PathBuf,
}

impl InstallLocation {
    pub fn new(root: impl Into<PathBuf>, marker_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            marker_path: marker_path.into(),
        }
    }

    pub fn payload(&self, config: &Config) -> InstalledPayload {
        InstalledPayload::derive(&self.root, config)
    }
}

/// Paths of an installed payload, derived from an install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPayload {
    pub install_root: PathBuf,
    pub payload_dir: PathBuf,
    pub version_file: PathBuf,
    pub staging_path: PathBuf,
    pub executable: PathBuf,
    pub working_dir: PathBuf,
}

impl InstalledPayload {
    pub fn derive(install_root: &Path, config: &Config) -> Self {
        let payload_dir = install_root.join(&config.payload_dir_name);
        Self {
            install_root: install_root.to_path_buf(),
            version_file: payload_dir.join(&config.version_file_name),
            staging_path: config.staging_path(),
            executable: payload_dir.join(&config.executable),
            working_dir: payload_dir.clone(),
            payload_dir,
        }
    }

    pub fn is_present(&self) -> bool {
        self.payload_dir.is_dir()
    }
}
