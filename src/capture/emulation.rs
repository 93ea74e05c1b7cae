use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
};
use chromiumoxide::page::Page;

use crate::config::MobileViewport;

fn device_metrics(viewport: &MobileViewport, height: u32) -> SetDeviceMetricsOverrideParams {
    SetDeviceMetricsOverrideParams::new(
        i64::from(viewport.width),
        i64::from(height),
        viewport.device_scale_factor,
        true,
    )
}

/// Emulate a touch-enabled mobile device at the given metrics.
pub async fn apply_mobile(page: &Page, viewport: &MobileViewport) -> Result<()> {
    page.execute(device_metrics(viewport, viewport.height))
        .await
        .context("Failed to set device metrics")?;
    page.execute(SetTouchEmulationEnabledParams::new(true))
        .await
        .context("Failed to enable touch emulation")?;

    tracing::debug!(
        "Emulating {}x{} @{}x mobile viewport",
        viewport.width,
        viewport.height,
        viewport.device_scale_factor
    );
    Ok(())
}

/// Keep the width and scale, change only the viewport height.
pub async fn resize(page: &Page, viewport: &MobileViewport, height: u32) -> Result<()> {
    page.execute(device_metrics(viewport, height.max(1)))
        .await
        .with_context(|| format!("Failed to resize viewport to {}px", height))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_metrics_are_mobile() {
        let params = device_metrics(&MobileViewport::default(), 4000);
        assert_eq!(params.width, 375);
        assert_eq!(params.height, 4000);
        assert_eq!(params.device_scale_factor, 2.0);
        assert!(params.mobile);
    }
}
