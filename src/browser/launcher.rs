use anyhow::{bail, Result};
use std::path::PathBuf;

/// Find the Chrome/Chromium binary on the current platform.
pub fn find_chrome_binary() -> Result<PathBuf> {
    let candidates = chrome_candidates();

    for candidate in &candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            tracing::debug!("Found Chrome at: {}", path.display());
            return Ok(path);
        }
    }

    for name in &[
        "google-chrome",
        "google-chrome-stable",
        "chromium-browser",
        "chromium",
        "chrome",
    ] {
        if let Ok(path) = which::which(name) {
            tracing::debug!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    bail!(
        "Could not find Chrome or Chromium (pass --chrome <PATH>). Searched:\n{}",
        candidates.join("\n")
    )
}

fn chrome_candidates() -> Vec<String> {
    let mut candidates = Vec::new();

    #[cfg(target_os = "macos")]
    {
        candidates.extend([
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".into(),
            "/Applications/Chromium.app/Contents/MacOS/Chromium".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            candidates.push(format!(
                "{}/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                home
            ));
        }
    }

    #[cfg(target_os = "linux")]
    {
        candidates.extend([
            "/usr/bin/google-chrome".into(),
            "/usr/bin/google-chrome-stable".into(),
            "/usr/bin/chromium-browser".into(),
            "/usr/bin/chromium".into(),
            "/snap/bin/chromium".into(),
        ]);
    }

    #[cfg(target_os = "windows")]
    {
        for var in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(dir) = std::env::var(var) {
                candidates.push(format!("{}\\Google\\Chrome\\Application\\chrome.exe", dir));
            }
        }
    }

    candidates
}

/// Launch flags shared by every capture. Window size and headless mode are
/// set through the config builder, not here. The sandbox stays on unless
/// `no_sandbox` is set (needed when Chrome runs as root in a container).
pub fn chrome_args(no_sandbox: bool) -> Vec<&'static str> {
    let mut args = vec![
        "--no-first-run",
        "--no-default-browser-check",
        "--disable-background-networking",
        "--disable-client-side-phishing-detection",
        "--disable-default-apps",
        "--disable-extensions",
        "--disable-hang-monitor",
        "--disable-popup-blocking",
        "--disable-prompt-on-repost",
        "--disable-sync",
        "--disable-translate",
        "--metrics-recording-only",
        "--safebrowsing-disable-auto-update",
        "--hide-scrollbars",
        "--mute-audio",
    ];

    if no_sandbox {
        args.push("--no-sandbox");
    }

    args
}
