use anyhow::Result;

/// Minimal blocking HTTP seam so URL sources can be exercised without a network.
pub trait HttpClient {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}
