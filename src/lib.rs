pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod output;
pub mod report;
pub mod table;
