//! Chrome/Chromium discovery.
//!
//! Lookup order: an explicit path, the `CSEARCH_CHROME` and `CHROME`
//! environment variables, well-known commands on `PATH`, then well-known
//! install locations.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{Result, SearchError};

/// Environment variables naming a browser executable, in priority order.
pub const CHROME_ENV_VARS: &[&str] = &["CSEARCH_CHROME", "CHROME"];

#[cfg(target_os = "macos")]
const KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(all(unix, not(target_os = "macos")))]
const KNOWN_PATHS: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(windows)]
const KNOWN_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

const KNOWN_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Finds an installed browser without an explicit path.
pub fn detect_chrome() -> Option<PathBuf> {
    for var in CHROME_ENV_VARS {
        if let Some(path) = std::env::var_os(var).map(PathBuf::from) {
            if path.is_file() {
                debug!("Browser from {}: {}", var, path.display());
                return Some(path);
            }
            debug!("Ignoring {}={}: not a file", var, path.display());
        }
    }

    if let Some(path) = KNOWN_COMMANDS.iter().find_map(|cmd| which::which(cmd).ok()) {
        debug!("Browser on PATH: {}", path.display());
        return Some(path);
    }

    KNOWN_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
}

/// Resolves the browser executable, preferring `explicit` when given.
pub fn locate_chrome(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(SearchError::Browser(format!(
            "browser executable {} does not exist",
            path.display()
        )));
    }

    let path = detect_chrome().ok_or_else(|| {
        SearchError::Browser(
            "no Chrome/Chromium installation found; install one or pass its path with --chrome"
                .into(),
        )
    })?;
    info!("Using browser at {}", path.display());
    Ok(path)
}
