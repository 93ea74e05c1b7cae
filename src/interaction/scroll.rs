use anyhow::{Context, Result};
use chromiumoxide::page::Page;
use std::time::{Duration, Instant};

/// Upper bound on scroll steps, for pages that grow forever.
const MAX_STEPS: usize = 400;

/// Full document height in CSS pixels.
pub async fn page_height(page: &Page) -> Result<u32> {
    let height: f64 = page
        .evaluate(
            "Math.max(document.body ? document.body.scrollHeight : 0, \
                      document.documentElement.scrollHeight)",
        )
        .await
        .context("Failed to measure page height")?
        .into_value()?;
    Ok(height.max(0.0).ceil() as u32)
}

/// Height in CSS pixels of what one viewport screenshot shows. Matches the
/// emulated height unless the page is zoomed.
pub async fn visible_height(page: &Page) -> Result<f64> {
    let height: f64 = page
        .evaluate("window.visualViewport ? window.visualViewport.height : window.innerHeight")
        .await
        .context("Failed to measure visible viewport")?
        .into_value()?;
    Ok(height.max(1.0))
}

/// Scroll to an absolute vertical offset and return where the browser
/// actually landed (it clamps near the bottom).
pub async fn scroll_to(page: &Page, y: u32) -> Result<u32> {
    let js = format!(
        "(() => {{ \
            window.scrollTo({{ left: 0, top: {}, behavior: 'instant' }}); \
            return window.scrollY; \
        }})()",
        y
    );
    let landed: f64 = page
        .evaluate(js.as_str())
        .await
        .context("Failed to scroll page")?
        .into_value()?;
    Ok(landed.max(0.0).round() as u32)
}

/// Walk down the page in `step` increments so lazy content gets a chance to
/// load, then return to the top. The height is re-read on every step since
/// it grows as content arrives. Returns the final height.
pub async fn scroll_through(
    page: &Page,
    step: u32,
    pause: Duration,
    timeout: Duration,
) -> Result<u32> {
    scroll_through_with_limit(page, step, pause, timeout, MAX_STEPS).await
}

/// [`scroll_through`] with an explicit cap on the number of steps.
pub async fn scroll_through_with_limit(
    page: &Page,
    step: u32,
    pause: Duration,
    timeout: Duration,
    max_steps: usize,
) -> Result<u32> {
    let step = step.max(1);
    let started = Instant::now();
    let mut y = 0u32;
    let mut height = page_height(page).await?;

    for _ in 0..max_steps {
        if y >= height || started.elapsed() >= timeout {
            break;
        }
        y = y.saturating_add(step);
        scroll_to(page, y).await?;
        tokio::time::sleep(pause).await;
        height = page_height(page).await?;
    }

    if y < height {
        tracing::warn!(
            "Stopped lazy-load scroll at {}px of {}px after {:?}",
            y,
            height,
            started.elapsed()
        );
    }

    scroll_to(page, 0).await?;
    tokio::time::sleep(pause).await;

    tracing::debug!("Scrolled through {}px", height);
    Ok(height)
}
