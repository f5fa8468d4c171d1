// lpad-common/src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{LpadError, Result};

const CONFIG_FILENAME: &str = "launcher.toml";
const LOCK_FILENAME: &str = ".lpad.lock";
const DEFAULT_PAYLOAD_DIR: &str = "Payload";
const DEFAULT_VERSION_FILE: &str = "Version.txt";
const DEFAULT_ARCHIVE_FILE: &str = "Payload.zip";
const DEFAULT_MARKER_FILE: &str = "install_location.txt";
const DEFAULT_MAX_LOCATION_ATTEMPTS: u32 = 5;

#[cfg(windows)]
const DEFAULT_EXECUTABLE: &str = "Game.exe";
#[cfg(not(windows))]
const DEFAULT_EXECUTABLE: &str = "Game";

/// Where the remote version comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VersionSourceKind {
    /// Plain-text document whose whole body is the version string.
    #[default]
    File,
    /// GitHub-style "latest release" JSON with a `tag_name`.
    ReleaseApi,
}

/// On-disk shape of `launcher.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    version_url: Option<String>,
    archive_url: Option<String>,
    release_api_url: Option<String>,
    version_source: Option<VersionSourceKind>,
    payload_dir_name: Option<String>,
    executable: Option<String>,
    version_file_name: Option<String>,
    archive_file_name: Option<String>,
    location_marker_file_name: Option<String>,
    max_location_attempts: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// The launcher's own working directory; holds the marker file and
    /// the staged archive.
    pub launcher_dir: PathBuf,
    pub version_source: VersionSourceKind,
    pub version_url: Option<String>,
    pub release_api_url: Option<String>,
    pub archive_url: String,
    pub payload_dir_name: String,
    /// Relative to the payload directory.
    pub executable: PathBuf,
    pub version_file_name: String,
    pub archive_file_name: String,
    pub location_marker_file_name: String,
    pub max_location_attempts: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        let launcher_dir = env::current_dir()?;
        Self::load_from(&launcher_dir)
    }

    /// Reads `launcher.toml` from `launcher_dir` (if present) and applies
    /// `LPAD_*` environment overrides.
    pub fn load_from(launcher_dir: &Path) -> Result<Self> {
        debug!("Loading lpad configuration from {}", launcher_dir.display());
        let config_path = launcher_dir.join(CONFIG_FILENAME);
        let file_config = if config_path.is_file() {
            let raw = fs::read_to_string(&config_path)?;
            toml::from_str::<FileConfig>(&raw).map_err(|e| {
                LpadError::Configuration(format!(
                    "Failed to parse {}: {e}",
                    config_path.display()
                ))
            })?
        } else {
            debug!(
                "No {} found, relying on environment overrides",
                config_path.display()
            );
            FileConfig::default()
        };

        let version_url = env_override("LPAD_VERSION_URL").or(file_config.version_url);
        let archive_url = env_override("LPAD_ARCHIVE_URL").or(file_config.archive_url);
        let release_api_url = env_override("LPAD_RELEASE_API_URL").or(file_config.release_api_url);

        let config = Self {
            launcher_dir: launcher_dir.to_path_buf(),
            version_source: file_config.version_source.unwrap_or_default(),
            version_url,
            release_api_url,
            archive_url: archive_url.ok_or_else(|| {
                LpadError::Configuration(format!(
                    "archive_url is not set (add it to {CONFIG_FILENAME} or set LPAD_ARCHIVE_URL)"
                ))
            })?,
            payload_dir_name: file_config
                .payload_dir_name
                .unwrap_or_else(|| DEFAULT_PAYLOAD_DIR.to_string()),
            executable: PathBuf::from(
                file_config
                    .executable
                    .unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string()),
            ),
            version_file_name: file_config
                .version_file_name
                .unwrap_or_else(|| DEFAULT_VERSION_FILE.to_string()),
            archive_file_name: file_config
                .archive_file_name
                .unwrap_or_else(|| DEFAULT_ARCHIVE_FILE.to_string()),
            location_marker_file_name: file_config
                .location_marker_file_name
                .unwrap_or_else(|| DEFAULT_MARKER_FILE.to_string()),
            max_location_attempts: file_config
                .max_location_attempts
                .unwrap_or(DEFAULT_MAX_LOCATION_ATTEMPTS)
                .max(1),
        };
        config.validate()?;
        debug!("Configuration loaded successfully.");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validate_url(&self.archive_url)?;
        match self.version_source {
            VersionSourceKind::File => {
                let url = self.version_url.as_deref().ok_or_else(|| {
                    LpadError::Configuration("version_url is not set".to_string())
                })?;
                validate_url(url)?;
            }
            VersionSourceKind::ReleaseApi => {
                let url = self.release_api_url.as_deref().ok_or_else(|| {
                    LpadError::Configuration(
                        "version_source is release-api but release_api_url is not set"
                            .to_string(),
                    )
                })?;
                validate_url(url)?;
            }
        }
        if self.executable.is_absolute() {
            return Err(LpadError::Configuration(format!(
                "executable must be relative to the payload directory, got {}",
                self.executable.display()
            )));
        }
        Ok(())
    }

    pub fn marker_path(&self) -> PathBuf {
        self.launcher_dir.join(&self.location_marker_file_name)
    }

    pub fn staging_path(&self) -> PathBuf {
        self.launcher_dir.join(&self.archive_file_name)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.launcher_dir.join("logs")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.launcher_dir.join(LOCK_FILENAME)
    }
}

fn env_override(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

pub fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url)
        .map_err(|e| LpadError::Configuration(format!("Invalid URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(LpadError::Configuration(format!(
            "Unsupported URL scheme '{other}' in {url}"
        ))),
    }
}
