//! Config synchronizer for the ESP shade controller.
//!
//! [`Synchronizer`] keeps a local mirror of the device status and
//! configuration. It talks to the device through a [`Channel`]; the
//! [`TcpChannel`] implementation frames packets over a TCP connection and
//! correlates responses by request id.
//!
//! # Example
//!
//! ```rust,ignore
//! use shade_schema::Schema;
//! use shade_sync::{ChannelOptions, Synchronizer, TcpChannel};
//!
//! let channel = TcpChannel::connect("esp_shades.local", 80, ChannelOptions::default()).await?;
//! let telemetry = channel.subscribe();
//! let sync = Synchronizer::new(channel, Schema::new()?);
//!
//! sync.load().await?;
//! sync.apply_input("stepperConfig.openSpeed", "400").await?;
//! sync.follow(telemetry).await;
//! ```

mod channel;
mod error;
pub mod metrics;
mod synchronizer;
mod tcp;

pub use channel::Channel;
pub use error::{ChannelError, SyncError};
pub use synchronizer::{Phase, Synchronizer};
pub use tcp::{ChannelOptions, TcpChannel};
