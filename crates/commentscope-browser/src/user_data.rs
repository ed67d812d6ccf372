//! The Chrome user-data directory a run browses with.
//!
//! A throwaway directory starts every run with an empty cookie jar, so the
//! session comes only from the cookie file. With `--user-data-dir` the
//! directory survives between runs, along with the LinkedIn cookies Chrome
//! stored in it.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Lock entry Chrome keeps in a user-data directory while it owns it
const SINGLETON_LOCK: &str = "SingletonLock";

/// Cookie databases for the default Chrome profile, old and new layout
const COOKIE_DATABASES: [&str; 2] = ["Default/Cookies", "Default/Network/Cookies"];

pub struct UserDataDir {
    path: PathBuf,
    retained: bool,
}

impl UserDataDir {
    /// The directory given with `--user-data-dir`, or a throwaway one
    pub fn for_run(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::retained(path.to_path_buf()),
            None => Self::throwaway(),
        }
    }

    /// Fresh directory removed again on drop
    pub fn throwaway() -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("commentscope-chrome-")
            .tempdir()
            .map_err(Error::Io)?
            .keep();
        tracing::debug!("Browsing with throwaway user-data dir {}", path.display());

        Ok(Self {
            path,
            retained: false,
        })
    }

    /// Directory kept across runs, created on first use
    pub fn retained(path: PathBuf) -> Result<Self> {
        if path.exists() && !path.is_dir() {
            return Err(Error::Browser(format!(
                "--user-data-dir {} exists and is not a directory",
                path.display()
            )));
        }
        std::fs::create_dir_all(&path).map_err(Error::Io)?;

        let dir = Self {
            path,
            retained: true,
        };
        if dir.has_saved_cookies() {
            tracing::info!(
                "Reusing Chrome user-data dir {} with saved cookies",
                dir.path.display()
            );
        }
        if dir.in_use() {
            tracing::warn!(
                "{} is locked; close any Chrome window using it before the run starts",
                dir.path.display()
            );
        }
        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_retained(&self) -> bool {
        self.retained
    }

    /// Whether Chrome has persisted a cookie jar here
    pub fn has_saved_cookies(&self) -> bool {
        COOKIE_DATABASES
            .iter()
            .any(|db| self.path.join(db).is_file())
    }

    /// Whether a Chrome instance holds (or crashed while holding) this directory
    pub fn in_use(&self) -> bool {
        // The lock is a dangling symlink on Linux and macOS
        self.path.join(SINGLETON_LOCK).symlink_metadata().is_ok()
    }
}

impl Drop for UserDataDir {
    fn drop(&mut self) {
        if !self.retained {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flag_browses_with_throwaway_dir() {
        let dir = UserDataDir::for_run(None).unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        assert!(!dir.is_retained());
        assert!(!dir.has_saved_cookies());

        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_retained_dir_outlives_the_run() {
        let parent = tempfile::tempdir().unwrap();
        let path = parent.path().join("linkedin-chrome");

        let dir = UserDataDir::for_run(Some(path.as_path())).unwrap();
        assert!(dir.is_retained());
        assert!(!dir.has_saved_cookies());
        drop(dir);

        assert!(path.is_dir());
    }

    #[test]
    fn test_detects_cookies_from_an_earlier_run() {
        let parent = tempfile::tempdir().unwrap();
        let network = parent.path().join("Default/Network");
        std::fs::create_dir_all(&network).unwrap();
        std::fs::write(network.join("Cookies"), b"SQLite format 3\0").unwrap();

        let dir = UserDataDir::retained(parent.path().to_path_buf()).unwrap();
        assert!(dir.has_saved_cookies());
    }

    #[test]
    fn test_file_is_not_a_user_data_dir() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = UserDataDir::retained(file.path().to_path_buf())
            .err()
            .unwrap();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_from_another_chrome_is_seen() {
        let parent = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("otherhost-4242", parent.path().join(SINGLETON_LOCK)).unwrap();

        let dir = UserDataDir::retained(parent.path().to_path_buf()).unwrap();
        assert!(dir.in_use());
    }
}
