use std::time::Duration;

use anyhow::{Result, bail};
use tracing::debug;

use super::client::HttpClient;

pub struct BasicClient(reqwest::blocking::Client);

impl BasicClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self(client))
    }
}

impl HttpClient for BasicClient {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.0.get(url).send()?;

        if !response.status().is_success() {
            let status = response.status();
            bail!("server returned status {}", status);
        }

        let bytes = response.bytes()?;
        debug!(url, bytes = bytes.len(), "Download complete");
        Ok(bytes.to_vec())
    }
}
