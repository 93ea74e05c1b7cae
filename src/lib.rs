pub mod browser;
pub mod capture;
pub mod config;
pub mod interaction;
pub mod pdf;
pub mod render;

pub use config::{CaptureMode, CaptureOptions, MobileViewport};
pub use render::{render, render_until, Interrupted, Report};
