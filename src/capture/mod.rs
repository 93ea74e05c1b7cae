pub mod cleanup;
pub mod emulation;
pub mod screenshot;

pub use screenshot::{Capture, Slice};
