//! DOM surgery applied before capture: drop what is invisible, pin what
//! floats, and squeeze the layout into the mobile width.

use anyhow::{Context, Result};
use chromiumoxide::page::Page;
use serde::Deserialize;

/// Stylesheet that stops motion and un-sticks headers.
pub fn freeze_css() -> &'static str {
    r#"
*, *::before, *::after {
  animation: none !important;
  transition: none !important;
  scroll-behavior: auto !important;
}
header, .sticky, .fixed,
[style*="position: sticky"], [style*="position:sticky"],
[style*="position: fixed"], [style*="position:fixed"] {
  position: static !important;
  top: auto !important;
}
"#
}

/// Stylesheet that locks the document to `width` CSS pixels.
pub fn mobile_width_css(width: u32) -> String {
    format!(
        r#"
html, body {{
  width: {width}px !important;
  max-width: {width}px !important;
  overflow-x: hidden !important;
}}
img, video {{
  max-width: 100% !important;
  height: auto !important;
}}
"#
    )
}

/// Append a `<style>` element with `css` to the document head.
pub async fn add_style_tag(page: &Page, css: &str) -> Result<()> {
    let js = format!(
        r#"(() => {{
            const style = document.createElement('style');
            style.setAttribute('data-mobile-pdf', '');
            style.textContent = {css};
            (document.head || document.documentElement).appendChild(style);
            return true;
        }})()"#,
        css = serde_json::to_string(css)?
    );
    page.evaluate(js.as_str())
        .await
        .context("Failed to inject style tag")?;
    Ok(())
}

/// Remove elements that are not displayed, hidden, or have no box.
/// Returns the number of elements removed.
pub async fn remove_hidden(page: &Page) -> Result<u32> {
    let removed: u32 = page
        .evaluate(
            r#"(() => {
                let removed = 0;
                // Lazy media has no box until its source arrives.
                const media = new Set(['IMG', 'PICTURE', 'VIDEO', 'IFRAME']);
                const isHidden = (el) => {
                    const style = getComputedStyle(el);
                    if (style.display === 'none') return true;
                    if (style.visibility === 'hidden') return true;
                    const collapsed = el.offsetWidth === 0 && el.offsetHeight === 0;
                    if (el instanceof HTMLElement && collapsed) {
                        return style.display !== 'contents' && !media.has(el.tagName);
                    }
                    return false;
                };
                const clean = (node) => {
                    for (const child of [...node.children]) {
                        if (isHidden(child)) {
                            child.remove();
                            removed++;
                        } else {
                            clean(child);
                        }
                    }
                };
                if (document.body) clean(document.body);
                return removed;
            })()"#,
        )
        .await
        .context("Failed to remove hidden elements")?
        .into_value()?;

    tracing::debug!("Removed {} hidden element(s)", removed);
    Ok(removed)
}

/// Disable animations and turn sticky/fixed elements into normal flow.
pub async fn freeze_layout(page: &Page) -> Result<u32> {
    add_style_tag(page, freeze_css()).await?;

    // Stylesheet rules miss elements positioned by class names we can't guess.
    let pinned: u32 = page
        .evaluate(
            r#"(() => {
                let pinned = 0;
                for (const el of document.querySelectorAll('body *')) {
                    const pos = getComputedStyle(el).position;
                    if (pos === 'sticky' || pos === 'fixed') {
                        el.style.setProperty('position', 'static', 'important');
                        el.style.setProperty('top', 'auto', 'important');
                        pinned++;
                    }
                }
                return pinned;
            })()"#,
        )
        .await
        .context("Failed to unpin sticky elements")?
        .into_value()?;

    tracing::debug!("Unpinned {} sticky/fixed element(s)", pinned);
    Ok(pinned)
}

/// Content of the `<meta name="viewport">` added to pages that lack one.
pub const VIEWPORT_META: &str = "width=device-width, initial-scale=1";

/// Lay the page out at device width. Without a viewport meta tag a mobile
/// browser uses a 980px layout viewport zoomed out to fit, so one is added
/// (or fixed up) before the width lock goes in. Returns whether the meta tag
/// was changed.
pub async fn force_mobile_width(page: &Page, width: u32) -> Result<bool> {
    let js = format!(
        r#"(() => {{
            let meta = document.querySelector('meta[name="viewport"]');
            if (meta && /width\s*=\s*device-width/.test(meta.content || '')) return false;
            if (!meta) {{
                meta = document.createElement('meta');
                meta.name = 'viewport';
                (document.head || document.documentElement).prepend(meta);
            }}
            meta.content = {content};
            return true;
        }})()"#,
        content = serde_json::to_string(VIEWPORT_META)?
    );
    let changed: bool = page
        .evaluate(js.as_str())
        .await
        .context("Failed to set viewport meta tag")?
        .into_value()?;
    if changed {
        tracing::debug!("Set viewport meta to '{}'", VIEWPORT_META);
    }

    add_style_tag(page, &mobile_width_css(width)).await?;
    Ok(changed)
}

#[derive(Debug, Deserialize)]
struct ReflowResult {
    rows: u32,
}

/// Stack two-child flex rows vertically when they do not fit side by side.
/// Returns the number of rows changed.
pub async fn reflow_flex_rows(page: &Page, width: u32) -> Result<u32> {
    let js = format!(
        r#"(() => {{
            const width = {width};
            let rows = 0;
            for (const el of document.querySelectorAll('body *')) {{
                const style = getComputedStyle(el);
                if (style.display !== 'flex' && style.display !== 'inline-flex') continue;
                if (!style.flexDirection.startsWith('row')) continue;
                if (el.children.length !== 2) continue;
                const [a, b] = el.children;
                const overflowing = el.scrollWidth > width;
                const cramped = a.getBoundingClientRect().width < width * 0.4
                    && b.getBoundingClientRect().width < width * 0.4;
                if (!overflowing && !cramped) continue;
                el.style.setProperty('flex-direction', 'column', 'important');
                el.style.setProperty('flex-wrap', 'nowrap', 'important');
                for (const child of el.children) {{
                    child.style.setProperty('width', '100%', 'important');
                    child.style.setProperty('max-width', '100%', 'important');
                }}
                rows++;
            }}
            return {{ rows }};
        }})()"#,
        width = width
    );

    let result: ReflowResult = page
        .evaluate(js.as_str())
        .await
        .context("Failed to reflow flex rows")?
        .into_value()?;

    tracing::debug!("Reflowed {} flex row(s)", result.rows);
    Ok(result.rows)
}

/// Make lazy images load now: drop `loading="lazy"` and promote `data-src`.
pub async fn eager_images(page: &Page) -> Result<u32> {
    let touched: u32 = page
        .evaluate(
            r#"(() => {
                let touched = 0;
                for (const img of document.querySelectorAll('img')) {
                    let changed = false;
                    if (img.loading === 'lazy') { img.loading = 'eager'; changed = true; }
                    if (!img.getAttribute('src') && img.dataset.src) {
                        img.src = img.dataset.src; changed = true;
                    }
                    if (!img.getAttribute('srcset') && img.dataset.srcset) {
                        img.srcset = img.dataset.srcset; changed = true;
                    }
                    if (changed) touched++;
                }
                return touched;
            })()"#,
        )
        .await
        .context("Failed to promote lazy images")?
        .into_value()?;
    Ok(touched)
}
