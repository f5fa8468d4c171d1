// lpad-core/src/permissions.rs
//! Checks whether the current user may create entries in a directory.
use std::path::Path;

use tracing::debug;

/// Inspects `path` against the current user's identity and groups, then
/// confirms by creating and removing a scratch directory inside it.
/// Any inspection failure counts as "no".
pub async fn can_create_in(path: &Path) -> bool {
    let path = path.to_path_buf();
    match tokio::task::spawn_blocking(move || can_create_in_blocking(&path)).await {
        Ok(allowed) => allowed,
        Err(e) => {
            debug!("Permission inspection task failed: {}", e);
            false
        }
    }
}

pub fn can_create_in_blocking(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            debug!("{} is not a directory", path.display());
            return false;
        }
        Err(e) => {
            debug!("Cannot inspect {}: {}", path.display(), e);
            return false;
        }
    }
    access_allows_create(path) && scratch_dir_round_trip(path)
}

/// Asks the kernel with the effective ids, so supplementary groups, ACLs and
/// read-only mounts are all taken into account.
#[cfg(unix)]
fn access_allows_create(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        debug!("{} contains a NUL byte", path.display());
        return false;
    };
    // SAFETY: `c_path` is a valid NUL-terminated string for the whole call.
    let rc = unsafe {
        libc::faccessat(
            libc::AT_FDCWD,
            c_path.as_ptr(),
            libc::W_OK | libc::X_OK,
            libc::AT_EACCESS,
        )
    };
    if rc != 0 {
        debug!(
            "No write access to {}: {}",
            path.display(),
            std::io::Error::last_os_error()
        );
        return false;
    }
    true
}

#[cfg(not(unix))]
fn access_allows_create(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.permissions().readonly() => {
            debug!("{} is read-only", path.display());
            false
        }
        Ok(_) => true,
        Err(_) => false,
    }
}

/// Creates and removes a hidden directory inside `path`. Catches what the
/// access check cannot see, such as pseudo filesystems that refuse mkdir.
fn scratch_dir_round_trip(path: &Path) -> bool {
    match tempfile::Builder::new()
        .prefix(".lpad-write-check")
        .tempdir_in(path)
    {
        Ok(scratch) => match scratch.close() {
            Ok(()) => true,
            Err(e) => {
                debug!("Scratch directory in {} not removable: {}", path.display(), e);
                false
            }
        },
        Err(e) => {
            debug!("Scratch directory in {} failed: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_is_writable() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(can_create_in_blocking(tmp.path()));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_path_and_files_fail_closed() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!can_create_in_blocking(&tmp.path().join("nope")));
        let file = tmp.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(!can_create_in_blocking(&file));
    }

    #[cfg(unix)]
    #[test]
    fn read_only_directory_is_rejected_for_regular_users() {
        use std::os::unix::fs::PermissionsExt;

        // SAFETY: geteuid has no preconditions.
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let locked = tmp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();
        assert!(!can_create_in_blocking(&locked));
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(can_create_in_blocking(&locked));
    }

    /// `/proc` refuses new entries even for root, whose access check passes.
    #[cfg(target_os = "linux")]
    #[test]
    fn proc_is_rejected_for_every_user() {
        let proc_dir = Path::new("/proc");
        if !proc_dir.is_dir() {
            return;
        }
        assert!(!can_create_in_blocking(proc_dir));
    }
}
