use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}\nreason: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse config file: {path}\nreason: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error(
        "Missing required configuration for {strategy} deployment: {}\n\
         Set them in the config file or as environment variables.",
        .missing.join(", ")
    )]
    MissingFields {
        strategy: String,
        missing: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
