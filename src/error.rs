use std::path::PathBuf;

use thiserror::Error;

/// Failures at the load boundary. Anything past loading degrades instead of failing.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "scorecard data file not found: {} (pass --data-path or set SCORECARD_DATA_PATH)",
        path.display()
    )]
    NotFound { path: PathBuf },
    #[error("failed to read {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to download {url}: {message}")]
    Http { url: String, message: String },
    #[error("{origin} has no header row")]
    EmptyHeader { origin: String },
}

impl LoadError {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::NotFound { .. } => "not_found",
            LoadError::Io { .. } => "io",
            LoadError::Csv { .. } => "csv",
            LoadError::Http { .. } => "http",
            LoadError::EmptyHeader { .. } => "empty_header",
        }
    }

    pub fn io(origin: &str, source: std::io::Error) -> Self {
        LoadError::Io {
            origin: origin.to_string(),
            source,
        }
    }

    pub fn csv(origin: &str, source: csv::Error) -> Self {
        LoadError::Csv {
            origin: origin.to_string(),
            source,
        }
    }
}
