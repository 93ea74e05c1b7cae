use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// How the rendered page is turned into images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CaptureMode {
    /// Grow the viewport to the full document height and take one screenshot.
    Single,
    /// Scroll through the page and take one screenshot per viewport height.
    #[default]
    Slices,
}

/// Device metrics used for mobile emulation. Touch and the mobile flag are
/// always enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobileViewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Default for MobileViewport {
    fn default() -> Self {
        Self {
            width: 375,
            height: 667,
            device_scale_factor: 2.0,
        }
    }
}

/// Everything a single capture run needs.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub url: String,
    pub output: PathBuf,
    pub png_output: Option<PathBuf>,
    pub mode: CaptureMode,
    pub viewport: MobileViewport,
    pub settle: Duration,
    pub idle: Duration,
    pub timeout: Duration,
    pub reflow: bool,
    pub lazy_scroll: bool,
    pub headless: bool,
    pub sandbox: bool,
    pub chrome: Option<PathBuf>,
}

impl CaptureOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output: PathBuf::from("mobile.pdf"),
            png_output: None,
            mode: CaptureMode::default(),
            viewport: MobileViewport::default(),
            settle: Duration::from_millis(500),
            idle: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            reflow: true,
            lazy_scroll: true,
            headless: true,
            sandbox: true,
            chrome: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url)
            .with_context(|| format!("Invalid URL: {}", self.url))?;
        match parsed.scheme() {
            "http" | "https" | "file" | "about" | "data" => {}
            other => bail!("Unsupported URL scheme '{}' in {}", other, self.url),
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            bail!(
                "Viewport must be non-empty (got {}x{})",
                self.viewport.width,
                self.viewport.height
            );
        }
        let scale = self.viewport.device_scale_factor;
        if !scale.is_finite() || scale <= 0.0 {
            bail!("Device scale factor must be a positive number (got {})", scale);
        }
        if self.timeout.is_zero() {
            bail!("Timeout must be greater than zero");
        }
        Ok(())
    }

    /// Path for the PNG of slice `index` (zero based). Single captures use
    /// the configured path as is.
    pub fn png_path(&self, index: usize, total: usize) -> Option<PathBuf> {
        let base = self.png_output.as_ref()?;
        if total <= 1 {
            return Some(base.clone());
        }
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mobile".into());
        Some(base.with_file_name(format!("{}-{:03}.png", stem, index + 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_mobile_profile() {
        let opts = CaptureOptions::new("https://example.com");
        assert_eq!(opts.viewport.width, 375);
        assert_eq!(opts.viewport.height, 667);
        assert_eq!(opts.viewport.device_scale_factor, 2.0);
        assert_eq!(opts.mode, CaptureMode::Slices);
        assert!(opts.sandbox);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let opts = CaptureOptions::new("not a url");
        assert!(opts.validate().is_err());

        let opts = CaptureOptions::new("ftp://example.com/file");
        let err = opts.validate().unwrap_err().to_string();
        assert!(err.contains("ftp"));
    }

    #[test]
    fn test_validate_accepts_file_url() {
        let opts = CaptureOptions::new("file:///tmp/page.html");
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_viewport() {
        let mut opts = CaptureOptions::new("https://example.com");
        opts.viewport.width = 0;
        assert!(opts.validate().is_err());

        let mut opts = CaptureOptions::new("https://example.com");
        opts.viewport.device_scale_factor = f64::NAN;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_png_path_single_and_sliced() {
        let mut opts = CaptureOptions::new("https://example.com");
        assert_eq!(opts.png_path(0, 1), None);

        opts.png_output = Some(PathBuf::from("/tmp/out/shot.png"));
        assert_eq!(opts.png_path(0, 1), Some(PathBuf::from("/tmp/out/shot.png")));
        assert_eq!(
            opts.png_path(1, 3),
            Some(PathBuf::from("/tmp/out/shot-002.png"))
        );
    }
}
