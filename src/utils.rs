use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::debug;

/// Scratch directory for a project: `~/scratch/<proj_name>`.
pub fn resolve_data_dir(proj_name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine the home directory"))?;
    Ok(home.join("scratch").join(proj_name))
}

/// Platform-conditioned scratch directory.
///
/// On Windows the data lives next to the sources (`<crate>/data/<extra..>`) and
/// `proj_name` is ignored; everywhere else this is [`resolve_data_dir`] and
/// `extra` is ignored. The two rules do not describe the same location.
pub fn resolve_data_dir_os(proj_name: &str, extra: &[&str]) -> Result<PathBuf> {
    if cfg!(windows) {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
        path.extend(extra);
        Ok(path)
    } else {
        resolve_data_dir(proj_name)
    }
}

/// Create a cache directory, tolerating a concurrent creator.
///
/// Several workers sharing a filesystem may race to create the same
/// directory; losing that race is fine as long as a directory is there.
/// The parent must already exist.
pub fn ensure_cache_dir(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    match fs::create_dir(path) {
        Ok(()) => {
            debug!(path = %path.display(), "created cache directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {
            debug!(path = %path.display(), "cache directory created concurrently");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_under_scratch() {
        let dir = resolve_data_dir("mnist-sweep").expect("home dir");
        assert!(dir.ends_with("scratch/mnist-sweep"));
    }

    #[cfg(not(windows))]
    #[test]
    fn data_dir_os_matches_home_rule_off_windows() {
        let a = resolve_data_dir_os("proj", &["ignored"]).unwrap();
        let b = resolve_data_dir("proj").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ensure_cache_dir_is_idempotent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cache = tmp.path().join("datasets");
        ensure_cache_dir(&cache).unwrap();
        ensure_cache_dir(&cache).unwrap();
        assert!(cache.is_dir());
    }

    #[test]
    fn ensure_cache_dir_rejects_file_in_the_way() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let blocker = tmp.path().join("datasets");
        fs::write(&blocker, b"not a dir").unwrap();
        let err = ensure_cache_dir(&blocker).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn ensure_cache_dir_propagates_missing_parent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let nested = tmp.path().join("missing").join("datasets");
        let err = ensure_cache_dir(&nested).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
