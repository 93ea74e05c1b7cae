use anyhow::{Context, Result};
use chromiumoxide::page::Page;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::browser::BrowserSession;
use crate::capture::{cleanup, emulation, screenshot, Capture};
use crate::config::{CaptureMode, CaptureOptions};
use crate::interaction::{scroll, wait};
use crate::pdf;

/// Pause between scroll steps, long enough for an IntersectionObserver to fire.
const SCROLL_PAUSE: Duration = Duration::from_millis(250);

/// The run was stopped before the PDF was written.
#[derive(Debug, thiserror::Error)]
#[error("interrupted before the PDF was written")]
pub struct Interrupted;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct Report {
    pub output: PathBuf,
    pub pages: usize,
    pub height: u32,
    pub removed: u32,
    pub unpinned: u32,
    pub reflowed: u32,
}

/// Render `options.url` to a PDF at `options.output`, stopping early on Ctrl-C.
pub async fn render(options: &CaptureOptions) -> Result<Report> {
    render_until(options, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for interrupt: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Render, giving up with [`Interrupted`] as soon as `shutdown` completes.
/// The browser is closed on every path.
pub async fn render_until<F>(options: &CaptureOptions, shutdown: F) -> Result<Report>
where
    F: Future<Output = ()>,
{
    options.validate()?;

    let session = BrowserSession::launch(options).await?;
    let result = tokio::select! {
        result = render_page(session.page(), options) => result,
        _ = shutdown => {
            tracing::info!("Received interrupt signal, shutting down");
            Err(Interrupted.into())
        }
    };

    session.close().await?;
    result
}

async fn render_page(page: &Page, options: &CaptureOptions) -> Result<Report> {
    let viewport = &options.viewport;
    emulation::apply_mobile(page, viewport).await?;

    tracing::info!("Navigating to: {}", options.url);
    page.goto(options.url.as_str())
        .await
        .with_context(|| format!("Failed to navigate to {}", options.url))?;
    wait::wait_for_network_idle(page, options.idle, options.timeout).await?;

    let removed = cleanup::remove_hidden(page).await?;
    let unpinned = cleanup::freeze_layout(page).await?;
    cleanup::force_mobile_width(page, viewport.width).await?;

    let reflowed = if options.reflow {
        cleanup::reflow_flex_rows(page, viewport.width).await?
    } else {
        0
    };

    wait::settle(options.settle).await;

    // Measured after the viewport meta is in place, so zoom is accounted for.
    let visible = scroll::visible_height(page).await?;
    let step = visible.floor().max(1.0) as u32;

    if options.lazy_scroll {
        let promoted = cleanup::eager_images(page).await?;
        tracing::debug!("Promoted {} lazy image(s)", promoted);
        scroll::scroll_through(page, step, SCROLL_PAUSE, options.timeout).await?;
        wait::wait_for_images(page, options.timeout).await?;
    }

    let height = scroll::page_height(page).await?;
    tracing::info!("Page height: {}px", height);

    let captures = match options.mode {
        CaptureMode::Single => capture_single(page, options, height).await?,
        CaptureMode::Slices => {
            let slices = screenshot::plan_slices(height, step);
            screenshot::capture_slices(page, &slices, f64::from(step), SCROLL_PAUSE).await?
        }
    };

    write_pngs(options, &captures).await?;

    let bytes = pdf::assemble(&captures)?;
    pdf::save(&options.output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", options.output.display()))?;

    let report = Report {
        output: options.output.clone(),
        pages: captures.len(),
        height,
        removed,
        unpinned,
        reflowed,
    };
    tracing::info!(
        "Wrote {} page(s) to {} ({} hidden removed, {} unpinned, {} rows reflowed)",
        report.pages,
        report.output.display(),
        report.removed,
        report.unpinned,
        report.reflowed
    );
    Ok(report)
}

/// Expand the viewport to the whole document and take one screenshot.
async fn capture_single(
    page: &Page,
    options: &CaptureOptions,
    height: u32,
) -> Result<Vec<Capture>> {
    emulation::resize(page, &options.viewport, height).await?;
    wait::settle(options.settle).await;
    let capture = screenshot::capture_viewport(page).await?;
    Ok(vec![capture])
}

async fn write_pngs(options: &CaptureOptions, captures: &[Capture]) -> Result<()> {
    for (i, capture) in captures.iter().enumerate() {
        let Some(path) = options.png_path(i, captures.len()) else {
            return Ok(());
        };
        pdf::save(&path, &capture.png)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Saved {}", path.display());
    }
    Ok(())
}
