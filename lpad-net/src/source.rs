// lpad-net/src/source.rs
//! Where the newest released [`Version`] is read from.
use std::future::Future;

use lpad_common::config::{Config, VersionSourceKind};
use lpad_common::error::{LpadError, Result};
use lpad_common::version::Version;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::http::{build_http_client, get_checked};

/// A network-addressable source of the latest release version.
///
/// Implementations do not retry; retry policy belongs to the caller.
pub trait RemoteVersionSource {
    fn fetch(&self) -> impl Future<Output = Result<Version>> + Send;
}

/// Plain-text document whose entire body is `major.minor.patch`.
#[derive(Debug, Clone)]
pub struct VersionFileSource {
    client: Client,
    url: String,
}

impl VersionFileSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl RemoteVersionSource for VersionFileSource {
    async fn fetch(&self) -> Result<Version> {
        debug!("Fetching remote version from {}", self.url);
        let body = get_checked(&self.client, &self.url)
            .await?
            .text()
            .await
            .map_err(|e| {
                LpadError::Network(format!("Failed to read body from {}: {e}", self.url))
            })?;
        parse_remote(&body, &self.url)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// GitHub-style "latest release" endpoint. The release tag (with an optional
/// leading `v`) is the version.
#[derive(Debug, Clone)]
pub struct ReleaseApiSource {
    client: Client,
    url: String,
}

impl ReleaseApiSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl RemoteVersionSource for ReleaseApiSource {
    async fn fetch(&self) -> Result<Version> {
        debug!("Fetching latest release from {}", self.url);
        let response = get_checked(&self.client, &self.url).await?;
        let bytes = response.bytes().await.map_err(|e| {
            LpadError::Network(format!("Failed to read body from {}: {e}", self.url))
        })?;
        let release: LatestRelease = serde_json::from_slice(&bytes).map_err(|e| {
            LpadError::Network(format!("Malformed release listing from {}: {e}", self.url))
        })?;
        let tag = release.tag_name.trim();
        let tag = tag.strip_prefix('v').unwrap_or(tag);
        parse_remote(tag, &self.url)
    }
}

/// Remote data must be a well-formed version; the lenient zero fallback is
/// only for local files.
fn parse_remote(text: &str, url: &str) -> Result<Version> {
    Version::try_parse(text).ok_or_else(|| {
        LpadError::Network(format!(
            "Malformed version '{}' served by {url}",
            text.trim()
        ))
    })
}

/// The source selected by `Config::version_source`.
#[derive(Debug, Clone)]
pub enum ConfiguredSource {
    File(VersionFileSource),
    ReleaseApi(ReleaseApiSource),
}

impl ConfiguredSource {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_http_client()?;
        let missing = |key: &str| LpadError::Configuration(format!("{key} is not set"));
        Ok(match config.version_source {
            VersionSourceKind::File => ConfiguredSource::File(VersionFileSource::new(
                client,
                config
                    .version_url
                    .clone()
                    .ok_or_else(|| missing("version_url"))?,
            )),
            VersionSourceKind::ReleaseApi => ConfiguredSource::ReleaseApi(ReleaseApiSource::new(
                client,
                config
                    .release_api_url
                    .clone()
                    .ok_or_else(|| missing("release_api_url"))?,
            )),
        })
    }
}

impl RemoteVersionSource for ConfiguredSource {
    async fn fetch(&self) -> Result<Version> {
        match self {
            ConfiguredSource::File(source) => source.fetch().await,
            ConfiguredSource::ReleaseApi(source) => source.fetch().await,
        }
    }
}
