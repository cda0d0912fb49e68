//! Request/response channel abstraction.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use shade_protocol::PacketType;

use crate::error::ChannelError;

/// A request/response link to the device.
///
/// Each call sends one packet and resolves with the payload of the response
/// correlated to it. Calls may overlap; the implementation matches each
/// response to its own request. Dropping the returned future abandons the
/// request, and a response arriving afterwards is discarded.
pub trait Channel: Send + Sync {
    /// Send `packet_type` with `payload` and wait for its response.
    ///
    /// An `ERROR` response resolves to [`ChannelError::Rejected`].
    fn request(
        &self,
        packet_type: PacketType,
        payload: Bytes,
    ) -> impl Future<Output = Result<Bytes, ChannelError>> + Send;
}

impl<C: Channel> Channel for Arc<C> {
    fn request(
        &self,
        packet_type: PacketType,
        payload: Bytes,
    ) -> impl Future<Output = Result<Bytes, ChannelError>> + Send {
        (**self).request(packet_type, payload)
    }
}
