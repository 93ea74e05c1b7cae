use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::page::Page;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::time::Duration;

use crate::interaction::scroll;

/// A vertical band of the document in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub offset: u32,
    pub height: u32,
}

/// One encoded PNG plus its pixel size.
#[derive(Debug, Clone)]
pub struct Capture {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Capture {
    pub fn from_png(png: Vec<u8>) -> Result<Self> {
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .context("Screenshot is not a valid PNG")?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            png,
        })
    }

    fn from_image(image: &DynamicImage) -> Result<Self> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .context("Failed to encode PNG")?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            png,
        })
    }
}

/// Split `total_height` into consecutive bands of `viewport_height`. The
/// last band keeps whatever is left over.
pub fn plan_slices(total_height: u32, viewport_height: u32) -> Vec<Slice> {
    let viewport_height = viewport_height.max(1);
    if total_height == 0 {
        return vec![Slice {
            offset: 0,
            height: viewport_height,
        }];
    }

    let mut slices = Vec::with_capacity(total_height.div_ceil(viewport_height) as usize);
    let mut offset = 0;
    while offset < total_height {
        let height = viewport_height.min(total_height - offset);
        slices.push(Slice { offset, height });
        offset += height;
    }
    slices
}

/// Pixel rows `(top, height)` of a viewport screenshot that belong to
/// `slice`, given where the page actually scrolled to and how many image
/// pixels one CSS pixel covers.
pub fn crop_offset(slice: &Slice, landed: u32, scale: f64, image_height: u32) -> (u32, u32) {
    let skip_css = slice.offset.saturating_sub(landed);
    let top = ((f64::from(skip_css) * scale).round() as u32).min(image_height);
    let wanted = (f64::from(slice.height) * scale).round() as u32;
    (top, wanted.min(image_height - top).max(1).min(image_height))
}

/// PNG of the current viewport.
pub async fn capture_viewport(page: &Page) -> Result<Capture> {
    let params = CaptureScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .build();
    let bytes = page
        .screenshot(params)
        .await
        .context("Failed to take screenshot")?;
    Capture::from_png(bytes)
}

/// Scroll to each slice and keep exactly the rows that belong to it.
/// `visible` is the CSS height one screenshot covers (see
/// [`scroll::visible_height`]); the pixel scale is taken from each shot.
pub async fn capture_slices(
    page: &Page,
    slices: &[Slice],
    visible: f64,
    pause: Duration,
) -> Result<Vec<Capture>> {
    let mut captures = Vec::with_capacity(slices.len());

    for (i, slice) in slices.iter().enumerate() {
        let landed = scroll::scroll_to(page, slice.offset).await?;
        tokio::time::sleep(pause).await;

        let shot = capture_viewport(page)
            .await
            .with_context(|| format!("Failed to capture slice {}", i + 1))?;
        let scale = f64::from(shot.height) / visible.max(1.0);
        let (top, height) = crop_offset(slice, landed, scale, shot.height);

        let capture = if top == 0 && height == shot.height {
            shot
        } else {
            let image = image::load_from_memory_with_format(&shot.png, ImageFormat::Png)?;
            Capture::from_image(&image.crop_imm(0, top, image.width(), height))?
        };

        tracing::debug!(
            "Slice {}/{} at {}px (landed {}px): {}x{}",
            i + 1,
            slices.len(),
            slice.offset,
            landed,
            capture.width,
            capture.height
        );
        captures.push(capture);
    }

    scroll::scroll_to(page, 0).await?;
    Ok(captures)
}
