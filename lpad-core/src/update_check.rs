// lpad-core/src/update_check.rs
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use lpad_common::error::Result;
use lpad_common::paths::InstalledPayload;
use lpad_common::state::{LauncherState, StateMachine, UpdateIntent};
use lpad_common::version::Version;
use lpad_net::RemoteVersionSource;
use tracing::{debug, warn};

pub const MSG_INSTALL_AVAILABLE: &str = "Install available";
pub const MSG_UPDATE_AVAILABLE: &str = "Update available";
pub const MSG_UP_TO_DATE: &str = "Up to date. Ready to launch!";
pub const MSG_CHECK_FAILED: &str = "Update check failed - retry";

/// What the local version file says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalVersion {
    Missing,
    /// Present but not `major.minor.patch`; carries the raw contents.
    Corrupt(String),
    Installed(Version),
}

pub fn read_local_version(version_file: &Path) -> Result<LocalVersion> {
    match fs::read_to_string(version_file) {
        Ok(raw) => Ok(match Version::try_parse(&raw) {
            Some(v) => LocalVersion::Installed(v),
            None => LocalVersion::Corrupt(raw),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(LocalVersion::Missing),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub state: LauncherState,
    pub intent: Option<UpdateIntent>,
    pub local: Option<Version>,
    pub remote: Option<Version>,
}

pub struct UpdateChecker<S> {
    source: S,
}

impl<S: RemoteVersionSource> UpdateChecker<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Compares the installed version against the remote one and moves
    /// `machine` to Waiting, Ready or Failed.
    ///
    /// Only a strictly newer remote offers an update; an equal or older
    /// remote resolves to Ready.
    pub async fn check(
        &self,
        payload: &InstalledPayload,
        machine: &StateMachine,
    ) -> Result<CheckOutcome> {
        let local = match read_local_version(&payload.version_file) {
            Ok(local) => local,
            Err(e) => {
                machine.transition(LauncherState::Failed, MSG_CHECK_FAILED)?;
                return Err(e);
            }
        };

        let local = match local {
            LocalVersion::Installed(v) => v,
            LocalVersion::Missing => {
                debug!(
                    "No version file at {}; fresh install needed",
                    payload.version_file.display()
                );
                return self.offer(machine, UpdateIntent::FreshInstall, None, None);
            }
            LocalVersion::Corrupt(raw) => {
                warn!(
                    "Unreadable version '{}' in {}; treating as a fresh install",
                    raw.trim(),
                    payload.version_file.display()
                );
                return self.offer(machine, UpdateIntent::FreshInstall, None, None);
            }
        };
        machine.set_versions(Some(local), None);

        let remote = match self.source.fetch().await {
            Ok(remote) => remote,
            Err(e) => {
                warn!("Failed to fetch remote version: {}", e);
                machine.transition(LauncherState::Failed, MSG_CHECK_FAILED)?;
                return Err(e);
            }
        };
        machine.set_versions(None, Some(remote));

        if remote.is_newer_than(&local) {
            debug!("Update available: {} -> {}", local, remote);
            self.offer(machine, UpdateIntent::Update, Some(local), Some(remote))
        } else {
            if remote < local {
                warn!(
                    "Remote version {} is older than installed {}; keeping installed",
                    remote, local
                );
            }
            machine.transition(LauncherState::Ready, MSG_UP_TO_DATE)?;
            Ok(CheckOutcome {
                state: LauncherState::Ready,
                intent: None,
                local: Some(local),
                remote: Some(remote),
            })
        }
    }

    fn offer(
        &self,
        machine: &StateMachine,
        intent: UpdateIntent,
        local: Option<Version>,
        remote: Option<Version>,
    ) -> Result<CheckOutcome> {
        let message = match intent {
            UpdateIntent::FreshInstall => MSG_INSTALL_AVAILABLE,
            UpdateIntent::Update => MSG_UPDATE_AVAILABLE,
        };
        machine.set_intent(Some(intent));
        machine.transition(LauncherState::Waiting, message)?;
        Ok(CheckOutcome {
            state: LauncherState::Waiting,
            intent: Some(intent),
            local,
            remote,
        })
    }
}
