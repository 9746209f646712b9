//! Locating a local Chrome/Chromium executable.
//!
//! Lookup order: the `CHROME` environment variable, well-known command
//! names on `PATH`, then well-known install locations.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Environment variable naming an explicit Chrome executable.
pub const CHROME_ENV: &str = "CHROME";

#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(all(unix, not(target_os = "macos")))]
const INSTALL_PATHS: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/opt/chromium.org/chromium/chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(windows)]
const INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(unix, windows)))]
const INSTALL_PATHS: &[&str] = &[];

const PATH_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Finds a Chrome/Chromium executable on this machine.
pub fn detect_chrome() -> Option<PathBuf> {
    let from_env = std::env::var_os(CHROME_ENV).map(PathBuf::from);
    detect_chrome_from(from_env.as_deref())
}

fn detect_chrome_from(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            debug!("Chrome found via {}: {}", CHROME_ENV, path.display());
            return Some(path.to_path_buf());
        }
        debug!(
            "{} points at {}, which does not exist; continuing lookup",
            CHROME_ENV,
            path.display()
        );
    }

    if let Some(path) = PATH_COMMANDS.iter().find_map(|cmd| which::which(cmd).ok()) {
        debug!("Chrome found on PATH: {}", path.display());
        return Some(path);
    }

    let path = INSTALL_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())?;
    debug!("Chrome found at install location: {}", path.display());
    Some(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_explicit_path_is_used() {
        let exe = std::env::current_exe().unwrap();
        assert_eq!(detect_chrome_from(Some(exe.as_path())), Some(exe));
    }

    #[test]
    fn test_missing_explicit_path_is_skipped() {
        let missing = Path::new("/nonexistent/chrome/binary");
        if let Some(found) = detect_chrome_from(Some(missing)) {
            assert_ne!(found, missing);
            assert!(found.exists());
        }
    }

    #[test]
    fn test_detected_path_exists() {
        if let Some(path) = detect_chrome() {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_path_commands_cover_chromium() {
        assert!(PATH_COMMANDS.contains(&"chromium"));
        assert!(PATH_COMMANDS.contains(&"google-chrome"));
    }
}
