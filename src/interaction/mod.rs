pub mod scroll;
pub mod wait;
