use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid chart JSON: {0}")]
    ChartJson(#[from] serde_json::Error),
    #[error("invalid config file '{path}': {message}")]
    Config { path: PathBuf, message: String },
}
