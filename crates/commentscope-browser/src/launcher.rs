use crate::{Error, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Desktop user agent presented instead of the headless default
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;

/// Launch settings that change between runs
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub debugging_port: u16,
    pub window_size: (u32, u32),
    pub user_agent: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            debugging_port: DEFAULT_DEBUGGING_PORT,
            window_size: (1920, 1080),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Manages the Chrome process lifecycle
pub struct ChromeLauncher {
    chrome_path: PathBuf,
    profile_path: PathBuf,
    options: LaunchOptions,
}

impl ChromeLauncher {
    pub fn new(chrome_path: PathBuf, profile_path: PathBuf, options: LaunchOptions) -> Self {
        Self {
            chrome_path,
            profile_path,
            options,
        }
    }

    /// Start Chrome with remote debugging enabled
    pub fn launch(&self) -> Result<Child> {
        let args = self.build_args();
        tracing::debug!("Launching {} {}", self.chrome_path.display(), args.join(" "));

        Command::new(&self.chrome_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))
    }

    fn build_args(&self) -> Vec<String> {
        let (width, height) = self.options.window_size;
        let mut args = vec![
            format!("--remote-debugging-port={}", self.options.debugging_port),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            format!("--user-data-dir={}", self.profile_path.display()),
            format!("--window-size={},{}", width, height),
            format!("--user-agent={}", self.options.user_agent),
            "--disable-extensions".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
        ];

        if self.options.headless {
            args.push("--headless=new".to_string());
        } else {
            args.push("--start-maximized".to_string());
        }

        args.push("about:blank".to_string());
        args
    }

    pub fn debugging_port(&self) -> u16 {
        self.options.debugging_port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher(options: LaunchOptions) -> ChromeLauncher {
        ChromeLauncher::new(
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/tmp/profile"),
            options,
        )
    }

    #[test]
    fn test_headless_args() {
        let args = launcher(LaunchOptions::default()).build_args();

        assert!(args.contains(&"--remote-debugging-port=9222".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
        assert_eq!(args.last().unwrap(), "about:blank");
    }

    #[test]
    fn test_headful_args() {
        let options = LaunchOptions {
            headless: false,
            debugging_port: 9333,
            ..LaunchOptions::default()
        };
        let launcher = launcher(options);
        let args = launcher.build_args();

        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(args.contains(&"--start-maximized".to_string()));
        assert_eq!(launcher.debugging_port(), 9333);
    }
}
