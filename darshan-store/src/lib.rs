mod client;
mod server;

pub use client::HttpTargetStore;
pub use server::{SERVER_HTTP_URL, location_url};
