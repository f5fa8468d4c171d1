// lpad-core/src/lib.rs
pub mod install;
pub mod launch;
pub mod location;
pub mod permissions;
pub mod session;
pub mod update_check;

pub use install::Installer;
pub use launch::ProcessLauncher;
pub use location::{DirectoryPicker, InstallLocationResolver, LocationRejection, LocationStore};
pub use session::Session;
pub use update_check::{read_local_version, CheckOutcome, LocalVersion, UpdateChecker};
