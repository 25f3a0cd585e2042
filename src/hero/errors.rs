use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why the hero model never made it into the scene.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("failed to load model '{path}': {reason}")]
    Failed { path: String, reason: String },
    #[error("model '{path}' contains no renderable meshes")]
    EmptyScene { path: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error("{0} expects a value")]
    MissingValue(String),
    #[error("{flag} expects a number, got '{value}'")]
    InvalidNumber { flag: String, value: String },
    #[error("unknown option: {0}")]
    UnknownOption(String),
}
