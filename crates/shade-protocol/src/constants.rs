//! Protocol constants
//!
//! Sizes, signatures and defaults shared by the device firmware and clients.

/// Frame signature, sent little-endian as `CA AC`.
pub const PACKET_SIGNATURE: u16 = 0xACCA;

/// Frame header: signature(2) + request_id(2) + type(1) + size(2).
pub const HEADER_SIZE: usize = 7;

/// Largest frame the device will accept or emit.
pub const MAX_PACKET_SIZE: usize = 260;

/// Largest payload that fits in one frame.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - HEADER_SIZE;

/// Request id reserved for unsolicited pushes from the device.
pub const PUSH_REQUEST_ID: u16 = 0;

/// Width of every fixed-length string stored on the device.
pub const CONFIG_STRING_SIZE: usize = 32;

/// Default device host name.
pub const DEFAULT_ADDRESS: &str = "esp_shades.local";

/// Default device port.
pub const DEFAULT_PORT: u16 = 80;

/// Default request timeout in milliseconds.
pub const REQUEST_TIMEOUT_MS: u64 = 2000;

/// Seconds in one day; night mode times are offsets from local midnight.
pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;
