use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open core library {path}: {source}")]
    LoadLibrary {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("core library {path} does not export `{symbol}`")]
    MissingSymbol {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("neither XDG_DATA_HOME nor HOME is set")]
    NoHomeDir,
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("string contains an interior NUL byte: {0:?}")]
    InteriorNul(String),
    #[error("core rejected game {0}")]
    GameLoad(String),
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to write config {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<std::ffi::NulError> for Error {
    fn from(err: std::ffi::NulError) -> Self {
        let bytes = err.into_vec();
        Error::InteriorNul(String::from_utf8_lossy(&bytes).into_owned())
    }
}
