//! Loads the Scorecard CSV into a [`RawTable`].
//!
//! Sources may be local paths or HTTP(S) URLs, plain or gzip-compressed.
//! Every record is read before returning, so a caller either gets the whole
//! table or a [`LoadError`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::fetch::{BasicClient, HttpClient, is_remote};
use crate::table::RawTable;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Loads a table from a file path or URL using the default HTTP client.
pub fn load_table(source: &str) -> Result<RawTable, LoadError> {
    if is_remote(source) {
        let client = BasicClient::new().map_err(|e| LoadError::Http {
            url: source.to_string(),
            message: format!("{e:#}"),
        })?;
        load_table_with(&client, source)
    } else {
        load_table_from_path(Path::new(source))
    }
}

/// Loads a table, fetching URLs through `client`.
#[tracing::instrument(skip(client))]
pub fn load_table_with<C: HttpClient>(client: &C, source: &str) -> Result<RawTable, LoadError> {
    if !is_remote(source) {
        return load_table_from_path(Path::new(source));
    }

    info!("Downloading scorecard data");
    let bytes = client.get_bytes(source).map_err(|e| LoadError::Http {
        url: source.to_string(),
        message: format!("{e:#}"),
    })?;

    if bytes.starts_with(&GZIP_MAGIC) {
        debug!("Response is gzip-compressed");
        read_table(GzDecoder::new(bytes.as_slice()), source)
    } else {
        read_table(bytes.as_slice(), source)
    }
}

#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_table_from_path(path: &Path) -> Result<RawTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let origin = path.display().to_string();
    let file = File::open(path).map_err(|e| LoadError::io(&origin, e))?;
    let reader = BufReader::new(file);

    let gzipped = path.extension().and_then(|e| e.to_str()) == Some("gz");
    let table = if gzipped {
        read_table(GzDecoder::new(reader), &origin)?
    } else {
        read_table(reader, &origin)?
    };

    info!(
        institutions = table.len(),
        columns = table.headers().len(),
        "Loaded scorecard data"
    );
    Ok(table)
}

/// Reads a whole CSV stream. `origin` only labels errors.
pub fn read_table<R: Read>(reader: R, origin: &str) -> Result<RawTable, LoadError> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| LoadError::csv(origin, e))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.trim_start_matches('\u{feff}').trim().is_empty()) {
        return Err(LoadError::EmptyHeader {
            origin: origin.to_string(),
        });
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| LoadError::csv(origin, e))?;
        rows.push(record);
    }

    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const SAMPLE: &str = "UNITID,INSTNM,MD_EARN_WNE_P10\n1,Alpha College,40000\n2,Beta University,PrivacySuppressed\n";

    struct FakeClient(Vec<u8>);

    impl HttpClient for FakeClient {
        fn get_bytes(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    struct FailingClient;

    impl HttpClient for FailingClient {
        fn get_bytes(&self, _url: &str) -> Result<Vec<u8>> {
            anyhow::bail!("connection refused")
        }
    }

    fn gzip(data: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_read_table_reads_all_rows() {
        let table = read_table(SAMPLE.as_bytes(), "sample").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.headers(), &["UNITID", "INSTNM", "MD_EARN_WNE_P10"]);
    }

    #[test]
    fn test_ragged_row_is_fatal() {
        let data = "UNITID,INSTNM\n1,Alpha\n2,Beta,extra\n";
        let err = read_table(data.as_bytes(), "ragged").unwrap_err();
        assert_eq!(err.kind(), "csv");
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let err = read_table("".as_bytes(), "empty").unwrap_err();
        assert_eq!(err.kind(), "empty_header");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_table("/definitely/not/here/scorecard.csv").unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert!(err.to_string().contains("--data-path"));
    }

    #[test]
    fn test_gzip_file_is_decompressed() {
        let path = std::env::temp_dir().join("scorecard_analyzer_test_load.csv.gz");
        std::fs::write(&path, gzip(SAMPLE)).unwrap();

        let table = load_table_from_path(&path).unwrap();
        assert_eq!(table.len(), 2);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_url_source_uses_client() {
        let client = FakeClient(SAMPLE.as_bytes().to_vec());
        let table = load_table_with(&client, "https://example.org/scorecard.csv").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_gzipped_download_is_detected_by_magic() {
        let client = FakeClient(gzip(SAMPLE));
        let table = load_table_with(&client, "https://example.org/scorecard").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_download_failure_is_http_error() {
        let err = load_table_with(&FailingClient, "https://example.org/scorecard.csv").unwrap_err();
        assert_eq!(err.kind(), "http");
        assert!(err.to_string().contains("connection refused"));
    }
}
