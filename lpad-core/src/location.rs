// lpad-core/src/location.rs
//! Choosing, remembering and moving the install location.
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use lpad_common::config::Config;
use lpad_common::error::{LpadError, Result};
use lpad_common::paths::InstallLocation;
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

use crate::permissions;

/// Why a picked directory was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationRejection {
    InvalidPath(PathBuf),
    PermissionDenied(PathBuf),
}

impl fmt::Display for LocationRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationRejection::InvalidPath(p) => write!(
                f,
                "'{}' is not an existing absolute directory. Please choose another location.",
                p.display()
            ),
            LocationRejection::PermissionDenied(p) => write!(
                f,
                "You do not have permission to create files in '{}'. Please choose another location.",
                p.display()
            ),
        }
    }
}

/// The directory-picker UI. Implemented by the shell.
pub trait DirectoryPicker {
    /// Asks the user for a directory. `rejection` explains why the previous
    /// pick was refused. `None` means the user backed out.
    fn pick(&mut self, rejection: Option<&LocationRejection>) -> Option<PathBuf>;
}

/// Reads and writes the one-line marker file holding the install root.
#[derive(Debug, Clone)]
pub struct LocationStore {
    marker_path: PathBuf,
}

impl LocationStore {
    pub fn new(marker_path: impl Into<PathBuf>) -> Self {
        Self {
            marker_path: marker_path.into(),
        }
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    /// Blank or whitespace-only markers count as absent.
    pub fn read(&self) -> Result<Option<PathBuf>> {
        match fs::read_to_string(&self.marker_path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    debug!("Marker {} is blank", self.marker_path.display());
                    Ok(None)
                } else {
                    Ok(Some(PathBuf::from(trimmed)))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn write(&self, root: &Path) -> Result<()> {
        self.prepare(root)?.commit()
    }

    /// Writes `root` to a temp file beside the marker without replacing it.
    /// Nothing changes on disk for readers until [`PendingMarker::commit`].
    pub fn prepare(&self, root: &Path) -> Result<PendingMarker> {
        let text = root.to_str().ok_or_else(|| {
            LpadError::Configuration(format!(
                "Install location {} is not valid UTF-8",
                root.display()
            ))
        })?;
        let dir = self
            .marker_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        writeln!(tmp, "{text}")?;
        tmp.as_file().sync_all()?;
        Ok(PendingMarker {
            tmp,
            root: root.to_path_buf(),
            marker_path: self.marker_path.clone(),
        })
    }
}

/// A marker update written but not yet swapped into place.
pub struct PendingMarker {
    tmp: NamedTempFile,
    root: PathBuf,
    marker_path: PathBuf,
}

impl PendingMarker {
    pub fn commit(self) -> Result<()> {
        let PendingMarker {
            tmp,
            root,
            marker_path,
        } = self;
        tmp.persist(&marker_path).map_err(|e| {
            error!("Failed to persist {}: {}", marker_path.display(), e);
            LpadError::from(e.error)
        })?;
        debug!(
            "Recorded install location {} in {}",
            root.display(),
            marker_path.display()
        );
        Ok(())
    }
}

pub struct InstallLocationResolver {
    store: LocationStore,
    payload_dir_name: String,
    max_attempts: u32,
    cached: Option<InstallLocation>,
}

impl InstallLocationResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            store: LocationStore::new(config.marker_path()),
            payload_dir_name: config.payload_dir_name.clone(),
            max_attempts: config.max_location_attempts,
            cached: None,
        }
    }

    pub fn store(&self) -> &LocationStore {
        &self.store
    }

    /// The persisted location, if one has been chosen before. Never prompts.
    pub fn current(&mut self) -> Result<Option<InstallLocation>> {
        if let Some(location) = &self.cached {
            return Ok(Some(location.clone()));
        }
        let location = self
            .store
            .read()?
            .map(|root| InstallLocation::new(root, self.store.marker_path()));
        if let Some(location) = &location {
            if !location.root.is_dir() {
                warn!(
                    "Recorded install location {} no longer exists",
                    location.root.display()
                );
            }
            self.cached = Some(location.clone());
        }
        Ok(location)
    }

    /// Returns the remembered location, prompting through `picker` (and
    /// persisting the answer) when none has been recorded yet.
    pub async fn resolve<P: DirectoryPicker>(&mut self, picker: &mut P) -> Result<InstallLocation> {
        if let Some(location) = self.current()? {
            return Ok(location);
        }
        let root = self.prompt_until_valid(picker).await?;
        self.store.write(&root)?;
        let location = InstallLocation::new(root, self.store.marker_path());
        self.cached = Some(location.clone());
        Ok(location)
    }

    /// `Ok(())` if `path` is an absolute directory the user may create
    /// entries in.
    pub async fn validate(path: &Path) -> std::result::Result<(), LocationRejection> {
        // The marker stores the path as text.
        if path.to_str().is_none() || !path.is_absolute() || !path.is_dir() {
            return Err(LocationRejection::InvalidPath(path.to_path_buf()));
        }
        if !permissions::can_create_in(path).await {
            return Err(LocationRejection::PermissionDenied(path.to_path_buf()));
        }
        Ok(())
    }

    async fn prompt_until_valid<P: DirectoryPicker>(&self, picker: &mut P) -> Result<PathBuf> {
        let mut rejection: Option<LocationRejection> = None;
        for attempt in 1..=self.max_attempts {
            let Some(candidate) = picker.pick(rejection.as_ref()) else {
                return Err(LpadError::Configuration(
                    "No install location was selected".to_string(),
                ));
            };
            match Self::validate(&candidate).await {
                Ok(()) => {
                    debug!(
                        "Accepted install location {} on attempt {}",
                        candidate.display(),
                        attempt
                    );
                    return Ok(candidate);
                }
                Err(reason) => {
                    warn!("Rejected install location: {}", reason);
                    rejection = Some(reason);
                }
            }
        }
        Err(LpadError::Configuration(format!(
            "No valid install location selected after {} attempts{}",
            self.max_attempts,
            rejection.map(|r| format!(": {r}")).unwrap_or_default()
        )))
    }

    /// Moves an installed payload from the current location to `new_root`
    /// and only then records `new_root`. If the move fails the recorded
    /// location is left pointing at the old, intact payload; if recording
    /// fails the payload is moved back.
    pub async fn change_location(&mut self, new_root: &Path) -> Result<InstallLocation> {
        Self::validate(new_root).await.map_err(|reason| match reason {
            LocationRejection::PermissionDenied(_) => LpadError::Permission(reason.to_string()),
            LocationRejection::InvalidPath(_) => LpadError::Configuration(reason.to_string()),
        })?;

        // Fails early on an unwritable launcher dir, before anything moves.
        let pending = self.store.prepare(new_root)?;
        let mut moved: Option<(PathBuf, PathBuf)> = None;

        if let Some(old) = self.current()? {
            if same_dir(&old.root, new_root) {
                debug!("Install location unchanged: {}", new_root.display());
                return Ok(old);
            }
            let from = old.root.join(&self.payload_dir_name);
            if from.is_dir() {
                let to = new_root.join(&self.payload_dir_name);
                if to.exists() {
                    return Err(LpadError::Configuration(format!(
                        "'{}' already exists; refusing to overwrite it",
                        to.display()
                    )));
                }
                move_payload(&from, &to).await?;
                moved = Some((to, from));
            }
        }

        if let Err(e) = pending.commit() {
            if let Some((to, from)) = moved {
                warn!(
                    "Could not record {}; moving payload back to {}",
                    new_root.display(),
                    from.display()
                );
                if let Err(back) = move_payload(&to, &from).await {
                    error!(
                        "Payload left at {} after failed rollback: {}",
                        to.display(),
                        back
                    );
                }
            }
            return Err(e);
        }

        let location = InstallLocation::new(new_root, self.store.marker_path());
        self.cached = Some(location.clone());
        Ok(location)
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

async fn move_payload(from: &Path, to: &Path) -> Result<()> {
    let from = from.to_path_buf();
    let to = to.to_path_buf();
    tokio::task::spawn_blocking(move || move_payload_blocking(&from, &to))
        .await
        .map_err(|e| LpadError::Generic(format!("JoinError while moving payload: {e}")))?
}

fn move_payload_blocking(from: &Path, to: &Path) -> Result<()> {
    debug!("Moving payload {} -> {}", from.display(), to.display());
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("Rename failed ({}), falling back to copy then delete", e);
            copy_then_swap(from, to)
        }
    }
}

/// Copies `from` into a hidden sibling of `to`, renames it into place and
/// only then deletes `from`. Until the rename, `from` is untouched and the
/// only thing to clean up is the staging copy.
fn copy_then_swap(from: &Path, to: &Path) -> Result<()> {
    let staging = staging_dir_for(to)?;
    if staging.exists() {
        debug!("Removing stale staging copy {}", staging.display());
        fs::remove_dir_all(&staging)?;
    }

    let mut options = fs_extra::dir::CopyOptions::new();
    options.content_only = true;
    if let Err(e) = fs_extra::dir::copy(from, &staging, &options) {
        error!(
            "Failed to copy payload {} -> {}: {}",
            from.display(),
            staging.display(),
            e
        );
        discard_dir(&staging);
        return Err(LpadError::Install(format!(
            "Failed to move payload to {}: {e}",
            to.display()
        )));
    }

    if let Err(e) = fs::rename(&staging, to) {
        discard_dir(&staging);
        return Err(LpadError::Install(format!(
            "Failed to move payload into {}: {e}",
            to.display()
        )));
    }

    if let Err(e) = fs::remove_dir_all(from) {
        warn!(
            "Payload copied to {} but the old copy at {} could not be removed: {}",
            to.display(),
            from.display(),
            e
        );
    }
    Ok(())
}

fn staging_dir_for(to: &Path) -> Result<PathBuf> {
    match (to.parent(), to.file_name()) {
        (Some(parent), Some(name)) => {
            let mut staged = std::ffi::OsString::from(".");
            staged.push(name);
            staged.push(".partial");
            Ok(parent.join(staged))
        }
        _ => Err(LpadError::Install(format!(
            "Cannot stage a move to {}",
            to.display()
        ))),
    }
}

fn discard_dir(dir: &Path) {
    if dir.exists() {
        if let Err(e) = fs::remove_dir_all(dir) {
            warn!("Could not remove partial copy at {}: {}", dir.display(), e);
        }
    }
}
