use anyhow::Result;
use chromiumoxide::page::Page;
use serde::Deserialize;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct LoadState {
    ready_state: String,
    resources: u64,
}

/// Wait until the document is complete and no new resource entries have
/// appeared for `idle`. Gives up with a warning after `timeout`.
pub async fn wait_for_network_idle(page: &Page, idle: Duration, timeout: Duration) -> Result<bool> {
    let started = Instant::now();
    let mut last: Option<LoadState> = None;
    let mut quiet_since = Instant::now();

    loop {
        let state: Option<LoadState> = match page
            .evaluate(
                "({ readyState: document.readyState, \
                    resources: performance.getEntriesByType('resource').length })",
            )
            .await
        {
            Ok(result) => result.into_value().ok(),
            Err(e) => {
                tracing::debug!("Load state check failed: {}", e);
                None
            }
        };

        if let Some(state) = state {
            if last.as_ref() != Some(&state) {
                quiet_since = Instant::now();
            }
            if state.ready_state == "complete" && quiet_since.elapsed() >= idle {
                tracing::debug!(
                    "Network idle after {:?} ({} resources)",
                    started.elapsed(),
                    state.resources
                );
                return Ok(true);
            }
            last = Some(state);
        }

        if started.elapsed() >= timeout {
            tracing::warn!("Timed out after {:?} waiting for network idle", timeout);
            return Ok(false);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Wait until every `<img>` in the document has finished loading or failed.
pub async fn wait_for_images(page: &Page, timeout: Duration) -> Result<bool> {
    let started = Instant::now();
    loop {
        // An unanswered check counts as still pending, never as done.
        let pending: Option<u64> = match page
            .evaluate("Array.from(document.images).filter(img => !img.complete).length")
            .await
        {
            Ok(result) => result.into_value().ok(),
            Err(e) => {
                tracing::debug!("Image check failed: {}", e);
                None
            }
        };

        if pending == Some(0) {
            return Ok(true);
        }
        if started.elapsed() >= timeout {
            match pending {
                Some(n) => tracing::warn!("{} image(s) still loading after {:?}", n, timeout),
                None => tracing::warn!("Could not confirm images loaded within {:?}", timeout),
            }
            return Ok(false);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Fixed pause to let layout and paint catch up.
pub async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
