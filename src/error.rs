use thiserror::Error;

/// Errors surfaced by the index filtering pipeline.
///
/// Every variant is fatal for the run: the job either completes or aborts,
/// and the variant identifies which stage gave up. Content-level shape
/// mismatches (a record missing its plan or file list) never construct an
/// error — those decode as empty collections and processing continues.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Network-level failure before or during the index download.
    #[error("failed to fetch index file: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The index endpoint answered with a non-success status.
    #[error("failed to fetch index file: HTTP {0}")]
    Status(reqwest::StatusCode),

    /// Structural JSON failure: malformed token, wrong top-level shape,
    /// truncated document. Mid-stream transport and gzip framing failures
    /// also land here (the decoder reads through the decompressor), with
    /// `serde_json::error::Category::Io`.
    #[error("failed to decode index document: {0}")]
    Decode(#[from] serde_json::Error),

    /// Output-side I/O failure: creating, writing or flushing the result
    /// file.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
