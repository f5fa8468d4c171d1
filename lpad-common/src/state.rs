// lpad-common/src/state.rs
//! Launcher state and the legal transitions between states.
//!
//! The [`StateMachine`] is the single writer of [`LauncherState`]. Observers
//! get a read-only [`StatusSnapshot`] through a `watch` channel; publishing a
//! snapshot never triggers further launcher logic.
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{LpadError, Result};
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LauncherState {
    Ready,
    Failed,
    Waiting,
    Downloading,
    Installing,
}

impl LauncherState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LauncherState::Ready | LauncherState::Failed)
    }

    /// Downloading and Installing block navigation until they settle.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, LauncherState::Downloading | LauncherState::Installing)
    }
}

impl fmt::Display for LauncherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LauncherState::Ready => "Ready",
            LauncherState::Failed => "Failed",
            LauncherState::Waiting => "Waiting",
            LauncherState::Downloading => "Downloading",
            LauncherState::Installing => "Installing",
        };
        f.write_str(s)
    }
}

/// Why the launcher is waiting for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateIntent {
    FreshInstall,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    /// `None` until the first check has run.
    pub state: Option<LauncherState>,
    pub message: String,
    pub intent: Option<UpdateIntent>,
    pub progress: Option<u8>,
    pub local_version: Option<Version>,
    pub remote_version: Option<Version>,
}

/// Whether `from -> to` is an edge of the launcher graph.
///
/// Checks (entry into the graph) are only allowed from no state or a
/// terminal state; Waiting may start a download or fail to start one.
pub fn is_legal_transition(from: Option<LauncherState>, to: LauncherState) -> bool {
    use LauncherState::*;
    match (from, to) {
        (None, Ready | Waiting | Failed) => true,
        (Some(Ready | Failed), Ready | Waiting | Failed) => true,
        (Some(Waiting), Downloading | Failed) => true,
        (Some(Downloading), Installing | Failed) => true,
        (Some(Installing), Ready | Failed) => true,
        _ => false,
    }
}

pub struct StateMachine {
    tx: watch::Sender<StatusSnapshot>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot::default());
        Self { tx }
    }

    pub fn state(&self) -> Option<LauncherState> {
        self.tx.borrow().state
    }

    /// A check may only start before the first check or from a terminal state.
    pub fn can_check(&self) -> bool {
        self.state().map_or(true, |s| s.is_terminal())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    /// Moves to `to`, replacing the status message. Illegal edges are
    /// rejected and leave the current state untouched.
    pub fn transition(&self, to: LauncherState, message: impl Into<String>) -> Result<()> {
        let from = self.state();
        if !is_legal_transition(from, to) {
            return Err(LpadError::InvalidTransition { from, to });
        }
        let message = message.into();
        debug!("Launcher state {:?} -> {} ({})", from, to, message);
        self.tx.send_modify(|snap| {
            snap.state = Some(to);
            snap.message = message;
            if to != LauncherState::Downloading {
                snap.progress = None;
            }
            if to == LauncherState::Ready {
                snap.intent = None;
            }
        });
        Ok(())
    }

    /// Progress only lands while a download is in flight; late events
    /// arriving after a terminal transition are dropped.
    pub fn set_progress(&self, percent: u8) -> bool {
        let percent = percent.min(100);
        self.tx.send_if_modified(|snap| {
            if snap.state != Some(LauncherState::Downloading) || snap.progress == Some(percent) {
                return false;
            }
            snap.progress = Some(percent);
            snap.message = format!("{percent}%");
            true
        })
    }

    pub fn set_intent(&self, intent: Option<UpdateIntent>) {
        self.tx.send_modify(|snap| snap.intent = intent);
    }

    pub fn set_versions(&self, local: Option<Version>, remote: Option<Version>) {
        self.tx.send_modify(|snap| {
            if local.is_some() {
                snap.local_version = local;
            }
            if remote.is_some() {
                snap.remote_version = remote;
            }
        });
    }
}
