//! Synchronizer and channel error types.

use std::io;

use shade_protocol::{DecodeError, EncodeError, PacketType};
use shade_schema::{PropertyKey, SchemaError};
use thiserror::Error;

use crate::synchronizer::Phase;

/// Errors reported by a [`crate::Channel`].
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No response arrived within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// The device answered with an `ERROR` packet.
    #[error("rejected by device: {0}")]
    Rejected(String),

    /// The connection is closed.
    #[error("connection closed")]
    Closed,

    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The request could not be framed.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// An inbound frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Errors reported by the [`crate::Synchronizer`].
#[derive(Error, Debug)]
pub enum SyncError {
    /// A response payload did not match its layout. Nothing from it was applied.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The request for `command` timed out.
    #[error("{command} request timed out")]
    RequestTimeout { command: PacketType },

    /// The device declined an update.
    #[error("device rejected {key}: {reason}")]
    ApplyRejected { key: PropertyKey, reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// `load` was called while another load is running.
    #[error("a load is already in progress")]
    LoadInProgress,

    /// State was read or written outside `Ready`.
    #[error("synchronizer is not ready ({phase})")]
    NotReady { phase: Phase },

    /// The packet type is not a device action.
    #[error("{0} is not an action")]
    NotAnAction(PacketType),

    /// The synchronizer was disconnected while the request was pending.
    #[error("disconnected during {command} request")]
    Disconnected { command: PacketType },

    /// The device acknowledged `key` after a reload or disconnect; the
    /// mirror was left alone.
    #[error("{key} was acknowledged after the state changed and was not applied locally")]
    Superseded { key: PropertyKey },

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}
