use std::io;
use std::path::PathBuf;

use shade_schema::SchemaError;
use shade_sync::{ChannelError, SyncError};
use thiserror::Error;

/// Errors reported by `shadectl`.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: ChannelError,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}
