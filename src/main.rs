use clap::Parser;
use mobile_pdf::render::Interrupted;
use mobile_pdf::{CaptureMode, CaptureOptions, MobileViewport};
use std::path::PathBuf;
use std::time::Duration;

/// mobile-pdf: render a page at phone size in headless Chrome and save it as a PDF
#[derive(Parser)]
#[command(name = "mobile-pdf", version, about)]
struct Cli {
    /// Page to render (http, https, file, about or data URL)
    url: String,

    /// Where to write the PDF
    #[arg(short, long, default_value = "mobile.pdf")]
    output: PathBuf,

    /// Also save the screenshot(s) as PNG; slices get -001, -002, ... suffixes
    #[arg(long, value_name = "PATH")]
    png: Option<PathBuf>,

    /// One tall screenshot, or one screenshot per viewport height
    #[arg(long, value_enum, default_value_t = CaptureMode::Slices)]
    mode: CaptureMode,

    /// Viewport width in CSS pixels
    #[arg(long, default_value_t = 375)]
    width: u32,

    /// Viewport height in CSS pixels
    #[arg(long, default_value_t = 667)]
    height: u32,

    /// Device scale factor
    #[arg(long, default_value_t = 2.0)]
    scale: f64,

    /// Delay after restyling the page, in milliseconds
    #[arg(long, default_value_t = 500)]
    settle_ms: u64,

    /// How long the network must stay quiet before capture, in milliseconds
    #[arg(long, default_value_t = 500)]
    idle_ms: u64,

    /// Upper bound for each wait, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Leave two-child flex rows side by side
    #[arg(long)]
    no_reflow: bool,

    /// Skip scrolling through the page to trigger lazy loading
    #[arg(long)]
    no_lazy_scroll: bool,

    /// Run Chrome with a visible window (default: headless)
    #[arg(long)]
    headed: bool,

    /// Disable Chrome's sandbox (only for root in containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Path to the Chrome/Chromium executable
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,
}

impl From<Cli> for CaptureOptions {
    fn from(cli: Cli) -> Self {
        Self {
            url: cli.url,
            output: cli.output,
            png_output: cli.png,
            mode: cli.mode,
            viewport: MobileViewport {
                width: cli.width,
                height: cli.height,
                device_scale_factor: cli.scale,
            },
            settle: Duration::from_millis(cli.settle_ms),
            idle: Duration::from_millis(cli.idle_ms),
            timeout: Duration::from_millis(cli.timeout_ms),
            reflow: !cli.no_reflow,
            lazy_scroll: !cli.no_lazy_scroll,
            headless: !cli.headed,
            sandbox: !cli.no_sandbox,
            chrome: cli.chrome,
        }
    }
}

/// Exit status for a run stopped by Ctrl-C (128 + SIGINT).
fn interrupt_exit_code(err: &anyhow::Error) -> Option<i32> {
    err.is::<Interrupted>().then_some(130)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr only, stdout carries the result line
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .init();

    let options = CaptureOptions::from(Cli::parse());
    options.validate()?;

    tracing::info!(
        "Rendering {} at {}x{} @{}x ({:?} mode)",
        options.url,
        options.viewport.width,
        options.viewport.height,
        options.viewport.device_scale_factor,
        options.mode
    );

    match mobile_pdf::render(&options).await {
        Ok(report) => println!("Created {}", report.output.display()),
        Err(e) => match interrupt_exit_code(&e) {
            Some(code) => std::process::exit(code),
            None => return Err(e),
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["mobile-pdf", "https://example.com"]).unwrap();
        let options = CaptureOptions::from(cli);
        assert_eq!(options.output, PathBuf::from("mobile.pdf"));
        assert_eq!(options.mode, CaptureMode::Slices);
        assert_eq!(options.viewport, MobileViewport::default());
        assert!(options.headless && options.reflow && options.lazy_scroll);
        assert!(options.sandbox);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "mobile-pdf",
            "https://example.com",
            "-o",
            "out/page.pdf",
            "--mode",
            "single",
            "--width",
            "414",
            "--scale",
            "3",
            "--no-reflow",
            "--headed",
        ])
        .unwrap();
        let options = CaptureOptions::from(cli);
        assert_eq!(options.output, PathBuf::from("out/page.pdf"));
        assert_eq!(options.mode, CaptureMode::Single);
        assert_eq!(options.viewport.width, 414);
        assert_eq!(options.viewport.device_scale_factor, 3.0);
        assert!(!options.reflow);
        assert!(!options.headless);
    }

    #[test]
    fn test_cli_no_sandbox_flag() {
        let cli =
            Cli::try_parse_from(["mobile-pdf", "https://example.com", "--no-sandbox"]).unwrap();
        assert!(!CaptureOptions::from(cli).sandbox);
    }

    #[test]
    fn test_interrupt_maps_to_exit_code() {
        assert_eq!(interrupt_exit_code(&Interrupted.into()), Some(130));
        assert_eq!(interrupt_exit_code(&anyhow::anyhow!("boom")), None);
    }

    #[test]
    fn test_cli_requires_url() {
        assert!(Cli::try_parse_from(["mobile-pdf"]).is_err());
    }
}
