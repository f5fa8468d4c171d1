// lpad-core/src/session.rs
//! Drives check → download → install → launch for one shell session.
//!
//! `Session` is the only writer of the launcher state. Background work
//! (network, extraction, permission inspection) runs on other tasks and is
//! awaited here, so every state change happens on the caller's task.
use std::fs;
use std::path::Path;
use std::process::Child;

use lpad_common::config::Config;
use lpad_common::error::{LpadError, Result};
use lpad_common::paths::{InstallLocation, InstalledPayload};
use lpad_common::state::{LauncherState, StateMachine, StatusSnapshot};
use lpad_common::version::Version;
use lpad_net::{
    CompletedDownload, ConfiguredSource, DownloadEvent, DownloadHandle, Downloader,
    RemoteVersionSource,
};
use tokio::sync::watch;
use tracing::{debug, error, instrument, warn};

use crate::install::Installer;
use crate::launch::ProcessLauncher;
use crate::location::InstallLocationResolver;
use crate::update_check::{CheckOutcome, UpdateChecker, MSG_UP_TO_DATE};

pub const MSG_DOWNLOAD_FAILED: &str = "Download failed - retry";
pub const MSG_INSTALL_FAILED: &str = "Install failed - retry";
pub const MSG_INSTALLING: &str = "Installing...";

pub struct Session<S = ConfiguredSource> {
    config: Config,
    location: InstallLocation,
    machine: StateMachine,
    checker: UpdateChecker<S>,
    downloader: Downloader,
    installer: Installer,
    /// Remote version the next download is for, once known.
    target: Option<Version>,
}

impl Session<ConfiguredSource> {
    pub fn from_config(config: Config, location: InstallLocation) -> Result<Self> {
        let source = ConfiguredSource::from_config(&config)?;
        let downloader = Downloader::new()?;
        Ok(Self::new(config, location, source, downloader))
    }
}

impl<S: RemoteVersionSource> Session<S> {
    pub fn new(
        config: Config,
        location: InstallLocation,
        source: S,
        downloader: Downloader,
    ) -> Self {
        let installer = Installer::new(&config);
        Self {
            config,
            location,
            machine: StateMachine::new(),
            checker: UpdateChecker::new(source),
            downloader,
            installer,
            target: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn location(&self) -> &InstallLocation {
        &self.location
    }

    pub fn payload(&self) -> InstalledPayload {
        self.location.payload(&self.config)
    }

    pub fn state(&self) -> Option<LauncherState> {
        self.machine.state()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.machine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.machine.subscribe()
    }

    /// Checks for updates. Allowed before the first check and from Ready or
    /// Failed; this is also how a failed session is retried.
    #[instrument(skip(self))]
    pub async fn check(&mut self) -> Result<CheckOutcome> {
        if !self.machine.can_check() {
            return Err(LpadError::InvalidTransition {
                from: self.machine.state(),
                to: LauncherState::Waiting,
            });
        }
        self.target = None;
        let outcome = self.checker.check(&self.payload(), &self.machine).await?;
        self.target = outcome.remote;
        Ok(outcome)
    }

    /// The user confirmed: Waiting → Downloading. Fresh installs learn the
    /// remote version here since the check did not need it.
    #[instrument(skip(self))]
    pub async fn begin_download(&mut self) -> Result<DownloadHandle> {
        let state = self.machine.state();
        if state != Some(LauncherState::Waiting) {
            return Err(LpadError::InvalidTransition {
                from: state,
                to: LauncherState::Downloading,
            });
        }

        let version = match self.target {
            Some(v) => v,
            None => match self.checker.source().fetch().await {
                Ok(v) => {
                    self.machine.set_versions(None, Some(v));
                    v
                }
                Err(e) => {
                    warn!("Could not determine version to download: {}", e);
                    self.machine
                        .transition(LauncherState::Failed, MSG_DOWNLOAD_FAILED)?;
                    return Err(e);
                }
            },
        };
        self.target = Some(version);

        let staging = self.config.staging_path();
        if staging.exists() {
            debug!("Removing stale staged archive {}", staging.display());
            if let Err(e) = fs::remove_file(&staging) {
                warn!("Could not remove {}: {}", staging.display(), e);
            }
        }

        self.machine.transition(LauncherState::Downloading, "0%")?;
        debug!(
            "Downloading {} for version {}",
            self.config.archive_url, version
        );
        Ok(self
            .downloader
            .start(&self.config.archive_url, &staging, version))
    }

    /// Consumes download events until the terminal one, then installs.
    /// Returns the installed version.
    #[instrument(skip(self, handle))]
    pub async fn finish_download(&mut self, mut handle: DownloadHandle) -> Result<Version> {
        loop {
            let event = handle.next_event().await;
            if let Some(version) = self.apply_download_event(event).await? {
                return Ok(version);
            }
        }
    }

    /// Applies one event from [`DownloadHandle::next_event`]. Returns the
    /// installed version once a completion has been installed, `None` while
    /// the download is still running.
    pub async fn apply_download_event(
        &mut self,
        event: Option<DownloadEvent>,
    ) -> Result<Option<Version>> {
        if self.machine.state() != Some(LauncherState::Downloading) {
            debug!("Download event arrived outside Downloading: {:?}", event);
            return Err(LpadError::InvalidTransition {
                from: self.machine.state(),
                to: LauncherState::Installing,
            });
        }
        match event {
            Some(DownloadEvent::Progress(percent)) => {
                self.machine.set_progress(percent);
                Ok(None)
            }
            Some(DownloadEvent::Completed(done)) => self.install(done).await.map(Some),
            Some(DownloadEvent::Failed(e)) => {
                error!("Download failed: {}", e);
                self.machine
                    .transition(LauncherState::Failed, MSG_DOWNLOAD_FAILED)?;
                Err(e)
            }
            None => {
                self.machine
                    .transition(LauncherState::Failed, MSG_DOWNLOAD_FAILED)?;
                Err(LpadError::Generic(
                    "Download ended without a completion event".to_string(),
                ))
            }
        }
    }

    /// `begin_download` followed by `finish_download`.
    pub async fn update(&mut self) -> Result<Version> {
        let handle = self.begin_download().await?;
        self.finish_download(handle).await
    }

    async fn install(&mut self, done: CompletedDownload) -> Result<Version> {
        self.machine
            .transition(LauncherState::Installing, MSG_INSTALLING)?;
        let payload = self.payload();
        // Cleanup of a partial payload happens inside `install`, before
        // Failed becomes visible.
        match self
            .installer
            .install(&done.path, done.version, &payload)
            .await
        {
            Ok(()) => {
                self.machine.set_versions(Some(done.version), None);
                self.machine.transition(LauncherState::Ready, MSG_UP_TO_DATE)?;
                self.target = None;
                Ok(done.version)
            }
            Err(e) => {
                self.machine
                    .transition(LauncherState::Failed, MSG_INSTALL_FAILED)?;
                Err(e)
            }
        }
    }

    /// Starts the installed executable. Only valid in Ready.
    pub fn launch(&self) -> Result<Child> {
        if self.machine.state() != Some(LauncherState::Ready) {
            return Err(LpadError::Launch(format!(
                "Cannot launch while the launcher is {}",
                self.machine
                    .state()
                    .map_or_else(|| "not checked yet".to_string(), |s| s.to_string())
            )));
        }
        ProcessLauncher::launch_payload(&self.payload())
    }

    /// Moves the payload to `new_root` and switches to it. Refused while a
    /// download or install is running.
    pub async fn change_location(
        &mut self,
        resolver: &mut InstallLocationResolver,
        new_root: &Path,
    ) -> Result<()> {
        if self.machine.state().is_some_and(|s| s.is_in_progress()) {
            return Err(LpadError::Generic(
                "Cannot change install location while a download or install is running"
                    .to_string(),
            ));
        }
        self.location = resolver.change_location(new_root).await?;
        Ok(())
    }
}
