use std::time::Duration;

use thiserror::Error;

/// Failures that can interrupt a crawl or one of its steps.
///
/// Per-field extraction failures never show up here: they become `None`
/// on the record being built.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A catalog or detail page never reached a ready state.
    #[error("page not ready after {timeout:?}: {url}")]
    PageLoad { url: String, timeout: Duration },

    /// Embedded listing metadata was absent or malformed.
    #[error("metadata parse error: {0}")]
    Parse(String),

    #[error("renderer error: {0}")]
    Renderer(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
