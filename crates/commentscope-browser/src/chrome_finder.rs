//! Locating the Chrome binary that hosts the LinkedIn session.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

const PATH_NAMES: [&str; 5] = [
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// How a Chrome binary was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeSource {
    /// Given with `--chrome-path`
    Explicit,
    /// A standard install location for the platform
    InstallLocation,
    /// An executable name resolved through `PATH`
    SearchPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromeBinary {
    pub path: PathBuf,
    pub source: ChromeSource,
}

/// Resolves `--chrome-path`, or searches install locations and then `PATH`.
///
/// An explicit path is never second-guessed: if it is missing or not
/// executable the search stops there with an error.
pub struct ChromeFinder {
    explicit: Option<PathBuf>,
    install_locations: Vec<PathBuf>,
    path_names: Vec<&'static str>,
}

impl ChromeFinder {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            install_locations: install_locations(),
            path_names: PATH_NAMES.to_vec(),
        }
    }

    pub fn find(&self) -> Result<ChromeBinary> {
        if let Some(path) = &self.explicit {
            ensure_executable(path)?;
            return Ok(ChromeBinary {
                path: path.clone(),
                source: ChromeSource::Explicit,
            });
        }

        if let Some(path) = self
            .install_locations
            .iter()
            .find(|p| ensure_executable(p).is_ok())
        {
            tracing::debug!("Using Chrome from {}", path.display());
            return Ok(ChromeBinary {
                path: path.clone(),
                source: ChromeSource::InstallLocation,
            });
        }

        for name in &self.path_names {
            if let Ok(path) = which::which(name) {
                tracing::debug!("Using `{}` from PATH ({})", name, path.display());
                return Ok(ChromeBinary {
                    path,
                    source: ChromeSource::SearchPath,
                });
            }
        }

        let searched = self
            .install_locations
            .iter()
            .map(|p| p.display().to_string())
            .chain(self.path_names.iter().map(|n| format!("{} on PATH", n)))
            .collect::<Vec<_>>();
        Err(Error::Browser(format!(
            "Chrome not found (searched {}). Pass --chrome-path to point at a Chrome or Chromium binary.",
            if searched.is_empty() {
                "nothing".to_string()
            } else {
                searched.join(", ")
            }
        )))
    }
}

fn install_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();

    if cfg!(target_os = "macos") {
        locations.push(PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ));
        locations.push(PathBuf::from(
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ));
        if let Some(home) = dirs::home_dir() {
            locations.push(home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"));
        }
    } else if cfg!(target_os = "windows") {
        locations.push(PathBuf::from(
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        ));
        locations.push(PathBuf::from(
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ));
        if let Some(local) = dirs::data_local_dir() {
            locations.push(local.join(r"Google\Chrome\Application\chrome.exe"));
        }
    } else {
        locations.extend(
            [
                "/usr/bin/google-chrome",
                "/usr/bin/chromium",
                "/usr/bin/chromium-browser",
                "/snap/bin/chromium",
            ]
            .map(PathBuf::from),
        );
    }

    locations
}

fn ensure_executable(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| Error::Browser(format!("Chrome not found at {}", path.display())))?;
    if !metadata.is_file() {
        return Err(Error::Browser(format!(
            "{} is not a Chrome binary",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(Error::Browser(format!(
                "{} is not executable",
                path.display()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_chrome(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    fn finder(explicit: Option<PathBuf>, install_locations: Vec<PathBuf>) -> ChromeFinder {
        ChromeFinder {
            explicit,
            install_locations,
            path_names: Vec::new(),
        }
    }

    #[test]
    fn test_chrome_path_flag_wins() {
        let dir = tempfile::tempdir().unwrap();
        let flagged = fake_chrome(dir.path(), "my-chrome");
        let installed = fake_chrome(dir.path(), "google-chrome");

        let found = finder(Some(flagged.clone()), vec![installed]).find().unwrap();
        assert_eq!(found.path, flagged);
        assert_eq!(found.source, ChromeSource::Explicit);
    }

    #[test]
    fn test_missing_chrome_path_flag_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let installed = fake_chrome(dir.path(), "google-chrome");

        let err = finder(Some(PathBuf::from("/nonexistent/chrome")), vec![installed])
            .find()
            .unwrap_err();
        assert!(err.to_string().contains("Chrome not found at /nonexistent/chrome"));
    }

    #[test]
    fn test_first_usable_install_location() {
        let dir = tempfile::tempdir().unwrap();
        let chromium = fake_chrome(dir.path(), "chromium");

        let found = finder(None, vec![dir.path().join("google-chrome"), chromium.clone()])
            .find()
            .unwrap();
        assert_eq!(found.path, chromium);
        assert_eq!(found.source, ChromeSource::InstallLocation);
    }

    #[test]
    fn test_directory_is_not_a_binary() {
        let dir = tempfile::tempdir().unwrap();
        let err = finder(Some(dir.path().to_path_buf()), vec![]).find().unwrap_err();
        assert!(err.to_string().contains("is not a Chrome binary"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_chrome_path_is_rejected() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = fake_chrome(dir.path(), "chrome");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = finder(Some(path), vec![]).find().unwrap_err();
        assert!(err.to_string().contains("is not executable"));
    }

    #[test]
    fn test_nothing_found_suggests_flag() {
        let err = finder(None, vec![PathBuf::from("/nonexistent/chrome")])
            .find()
            .unwrap_err()
            .to_string();
        assert!(err.contains("Chrome not found"));
        assert!(err.contains("/nonexistent/chrome"));
        assert!(err.contains("--chrome-path"));
    }
}
