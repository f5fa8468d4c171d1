// lpad-core/src/launch.rs
use std::path::Path;
use std::process::{Child, Command, Stdio};

use lpad_common::error::{LpadError, Result};
use lpad_common::paths::InstalledPayload;
use tracing::{debug, error};

pub struct ProcessLauncher;

impl ProcessLauncher {
    /// Spawns `executable` with `working_dir` as its working directory.
    ///
    /// The executable is looked up again on every call since it may have been
    /// moved or deleted since install.
    pub fn launch(executable: &Path, working_dir: &Path) -> Result<Child> {
        if !executable.is_file() {
            error!("Executable missing at {}", executable.display());
            return Err(LpadError::ExecutableMissing(executable.to_path_buf()));
        }
        debug!(
            "Launching {} in {}",
            executable.display(),
            working_dir.display()
        );
        let mut cmd = Command::new(executable);
        cmd.current_dir(working_dir).stdin(Stdio::null());
        cmd.spawn().map_err(|e| {
            error!("Failed to launch {}: {}", executable.display(), e);
            LpadError::Launch(format!("Failed to start {}: {e}", executable.display()))
        })
    }

    pub fn launch_payload(payload: &InstalledPayload) -> Result<Child> {
        Self::launch(&payload.executable, &payload.working_dir)
    }
}
