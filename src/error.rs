use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("chunk timeout must be greater than zero")]
    ZeroChunkTimeout,

    #[error("exporter queue length must be greater than zero")]
    ZeroQueueLen,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("bad line: {0:?}")]
    BadLine(String),
}
