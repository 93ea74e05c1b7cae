use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;

use super::launcher;
use crate::config::CaptureOptions;

/// Owns the CDP browser connection for one capture run.
pub struct BrowserSession {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
    page: Page,
    // Dropped after the browser so Chrome releases its profile first.
    _profile: tempfile::TempDir,
}

impl BrowserSession {
    /// Launch a new browser and open a blank page.
    pub async fn launch(options: &CaptureOptions) -> Result<Self> {
        let profile = tempfile::Builder::new()
            .prefix("mobile-pdf-")
            .tempdir()
            .context("Failed to create Chrome profile directory")?;

        let executable = match &options.chrome {
            Some(path) => path.clone(),
            None => launcher::find_chrome_binary()?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .user_data_dir(profile.path())
            .window_size(options.viewport.width, options.viewport.height);

        builder = if options.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };

        for arg in launcher::chrome_args(!options.sandbox) {
            builder = builder.arg(arg);
        }

        let config = builder.build().map_err(|e| anyhow::anyhow!("{}", e))?;

        let (browser, mut handler) =
            Browser::launch(config).await.context("Failed to launch Chrome")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to create initial page")?;

        tracing::info!("Browser session started (headless: {})", options.headless);

        Ok(Self {
            browser,
            handler_task,
            page,
            _profile: profile,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Failed waiting for browser exit: {}", e);
        }
        self.handler_task.abort();
        tracing::info!("Browser session closed");
        Ok(())
    }
}
