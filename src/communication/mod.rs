// communication/mod.rs
pub mod link;

pub use link::{channel_link, forward_bytes, ChannelLink};
