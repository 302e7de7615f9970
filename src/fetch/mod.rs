//! Download of remote CSV sources.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

/// True when `source` should be fetched over HTTP rather than read from disk.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
