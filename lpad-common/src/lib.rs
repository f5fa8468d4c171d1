// lpad-common/src/lib.rs
pub mod config;
pub mod error;
pub mod paths;
pub mod state;
pub mod version;

// Re-export key types
pub use config::{Config, VersionSourceKind};
pub use error::{ErrorCategory, LpadError, Result};
pub use paths::{InstallLocation, InstalledPayload};
pub use state::{LauncherState, StateMachine, StatusSnapshot, UpdateIntent};
pub use version::Version;
