pub mod client;

pub mod mock;

pub use client::TrelloClient;
pub use mock::{MockCall, MockTrackingClient};
