//! Config-loading errors, in the style of `conn_codec::CodecError`: a
//! crate-local `thiserror` enum that converts into the shared taxonomy at
//! the public-API boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build layered configuration: {0}")]
    Build(String),

    #[error("failed to deserialize configuration into ServiceConfig: {0}")]
    Deserialize(String),
}

impl From<ConfigError> for conn_types::ConnError {
    fn from(e: ConfigError) -> Self {
        conn_types::ConnError::new(conn_types::Kind::BadParameter, e.to_string())
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
