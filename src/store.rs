//! Keystore persistence: writability check and atomic replacement.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{LoaderError, LoaderResult};

/// Mode given to a keystore that did not exist before, so other users (the JVM) can read it.
#[cfg(unix)]
pub const NEW_FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Written,
    /// Nothing was changed. `refused_by` is the keystore itself, or its
    /// directory when only the temp file could not be created there.
    Denied { refused_by: PathBuf },
}

/// An I/O failure tagged with the path it happened on.
struct StepError {
    path: PathBuf,
    source: io::Error,
}

trait AtPath<T> {
    fn at(self, path: &Path) -> Result<T, StepError>;
}

impl<T> AtPath<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T, StepError> {
        self.map_err(|source| StepError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// True for the failures that mean "not allowed to write here", as opposed to
/// the write itself going wrong.
pub fn is_access_denied(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    #[cfg(unix)]
    {
        if err.raw_os_error() == Some(libc::EROFS) {
            return true;
        }
    }
    false
}

/// Check write access to an existing file without opening it.
#[cfg(unix)]
fn check_writable(path: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    if unsafe { libc::access(c_path.as_ptr(), libc::W_OK) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn check_writable(path: &Path) -> io::Result<()> {
    if fs::metadata(path)?.permissions().readonly() {
        return Err(io::Error::from(io::ErrorKind::PermissionDenied));
    }
    Ok(())
}

/// Replace `path` with `bytes` via a temp file in the same directory and a rename,
/// so readers see either the old or the new content. Existing permissions are
/// kept; a new file gets [`NEW_FILE_MODE`] on Unix.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> LoaderResult<PersistOutcome> {
    match try_write_atomic(path, bytes) {
        Ok(()) => Ok(PersistOutcome::Written),
        Err(e) if is_access_denied(&e.source) => {
            debug!(path = %e.path.display(), error = %e.source, "write access denied");
            Ok(PersistOutcome::Denied { refused_by: e.path })
        }
        Err(e) => Err(LoaderError::io(&e.path, e.source)),
    }
}

fn try_write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StepError> {
    let existing = match fs::metadata(path) {
        Ok(meta) => {
            check_writable(path).at(path)?;
            Some(meta.permissions())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e).at(path),
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).at(dir)?;

    let mut tmp = NamedTempFile::new_in(dir).at(dir)?;
    tmp.write_all(bytes).at(path)?;
    tmp.as_file().sync_all().at(path)?;
    let perms = match existing {
        Some(perms) => perms,
        None => new_file_permissions(tmp.as_file()).at(path)?,
    };
    tmp.as_file().set_permissions(perms).at(path)?;
    tmp.persist(path).map_err(|e| e.error).at(path)?;
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions(_file: &fs::File) -> io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn new_file_permissions(file: &fs::File) -> io::Result<fs::Permissions> {
    Ok(file.metadata()?.permissions())
}
