use thiserror::Error;

/// Error kinds surfaced by the engine (spec §7).
///
/// Per-key decode failures inside a scan are logged and skipped rather than
/// propagated as an `Error` — only failures that abort a whole operation
/// reach this type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Heed/LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("malformed: {0}")]
    Malformed(String),

    #[error("duplicate event")]
    Duplicate,

    #[error("not found")]
    NotFound,

    #[error("cancelled")]
    Cancelled,

    #[error("a truncated-hash candidate resolved to a different full id")]
    CollisionRejected,
}

pub type Result<T> = std::result::Result<T, Error>;
