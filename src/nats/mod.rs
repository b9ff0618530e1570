pub mod client;
pub mod messages;

pub use client::NatsOverlay;
pub use messages::OverlayMessage;
