//! Chrome process management and the CDP-backed page driver.

mod chrome_finder;
mod error;
mod launcher;
mod scripts;
mod session;
mod user_data;

pub use chrome_finder::{ChromeBinary, ChromeFinder, ChromeSource};
pub use error::{Error, Result};
pub use launcher::{ChromeLauncher, DEFAULT_DEBUGGING_PORT, DEFAULT_USER_AGENT, LaunchOptions};
pub use session::ChromeSession;
pub use user_data::UserDataDir;
