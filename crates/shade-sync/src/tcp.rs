//! Framed TCP channel to the device.
//!
//! A background task reads frames from the socket. Responses are routed to
//! the request waiting on their id; pushes (id 0) are decoded as telemetry
//! and broadcast to subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use shade_protocol::{
    FrameCodec, Packet, PacketType, Telemetry, PUSH_REQUEST_ID, REQUEST_TIMEOUT_MS,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::channel::Channel;
use crate::error::ChannelError;

/// Capacity of the telemetry broadcast.
const TELEMETRY_CAPACITY: usize = 64;

/// Requests awaiting a response, shared with the read task.
#[derive(Default)]
struct Pending {
    waiters: HashMap<u16, oneshot::Sender<Packet>>,
    closed: bool,
}

type SharedPending = Arc<Mutex<Pending>>;

/// Timeouts for a [`TcpChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        ChannelOptions {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }
}

/// Request/response channel over a framed TCP connection.
pub struct TcpChannel {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: SharedPending,
    next_id: AtomicU16,
    /// Template for [`Self::subscribe`]. The read task owns the only sender.
    telemetry: broadcast::Receiver<Telemetry>,
    request_timeout: Duration,
    reader: JoinHandle<()>,
}

impl TcpChannel {
    /// Connect to the device at `host:port`.
    pub async fn connect(host: &str, port: u16, options: ChannelOptions) -> Result<Self, ChannelError> {
        debug!("Connecting to {}:{}", host, port);
        let stream = tokio::time::timeout(options.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ChannelError::Timeout)??;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream, options.request_timeout))
    }

    /// Wrap an established connection.
    pub fn from_stream(stream: TcpStream, request_timeout: Duration) -> Self {
        let (read_half, write_half) = stream.into_split();
        let pending = SharedPending::default();
        let (sender, telemetry) = broadcast::channel(TELEMETRY_CAPACITY);

        let reader = tokio::spawn(read_loop(read_half, pending.clone(), sender));

        TcpChannel {
            writer: tokio::sync::Mutex::new(write_half),
            pending,
            next_id: AtomicU16::new(1),
            telemetry,
            request_timeout,
            reader,
        }
    }

    /// Subscribe to telemetry pushes.
    pub fn subscribe(&self) -> broadcast::Receiver<Telemetry> {
        self.telemetry.resubscribe()
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }

    /// Number of requests awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.pending.lock().waiters.len()
    }

    fn next_request_id(&self) -> u16 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != PUSH_REQUEST_ID {
                return id;
            }
        }
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl Channel for TcpChannel {
    async fn request(&self, packet_type: PacketType, payload: Bytes) -> Result<Bytes, ChannelError> {
        let id = self.next_request_id();
        let frame = Packet::new(id, packet_type, payload).encode()?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(ChannelError::Closed);
            }
            pending.waiters.insert(id, tx);
        }
        let _registration = Registration {
            pending: &self.pending,
            id,
        };

        trace!("Sending {} (id {}, {} bytes)", packet_type, id, frame.len());
        self.writer.lock().await.write_all(&frame).await?;

        let packet = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(packet)) => packet,
            Ok(Err(_)) => return Err(ChannelError::Closed),
            Err(_) => return Err(ChannelError::Timeout),
        };

        if let Some(reason) = packet.error_reason() {
            return Err(ChannelError::Rejected(reason));
        }
        if packet.packet_type != packet_type {
            debug!(
                "Response to {} (id {}) carries type {}",
                packet_type, id, packet.packet_type
            );
        }
        Ok(packet.payload)
    }
}

/// Removes a pending request when its caller finishes or gives up.
struct Registration<'a> {
    pending: &'a SharedPending,
    id: u16,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.pending.lock().waiters.remove(&self.id);
    }
}

async fn read_loop(mut reader: OwnedReadHalf, pending: SharedPending, telemetry: broadcast::Sender<Telemetry>) {
    let mut codec = FrameCodec::new();
    let mut buf = [0u8; 512];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("Device closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Read error: {}", e);
                break;
            }
        };
        codec.push(&buf[..n]);

        loop {
            match codec.decode() {
                Ok(Some(packet)) => dispatch(packet, &pending, &telemetry),
                Ok(None) => break,
                Err(e) => warn!("Dropping frame: {}", e),
            }
        }
    }

    // Dropping the senders fails every waiting request.
    let mut pending = pending.lock();
    pending.closed = true;
    pending.waiters.clear();
}

fn dispatch(packet: Packet, pending: &SharedPending, telemetry: &broadcast::Sender<Telemetry>) {
    if packet.is_push() {
        match Telemetry::decode(packet.packet_type, &packet.payload) {
            Ok(Some(update)) => {
                trace!("Telemetry {}", update);
                // No subscribers is fine.
                let _ = telemetry.send(update);
            }
            Ok(None) => debug!("Ignoring {} push", packet.packet_type),
            Err(e) => warn!("Bad {} push: {}", packet.packet_type, e),
        }
        return;
    }

    let waiter = pending.lock().waiters.remove(&packet.request_id);
    match waiter {
        Some(tx) => {
            let _ = tx.send(packet);
        }
        None => debug!(
            "Discarding {} response for abandoned request {}",
            packet.packet_type, packet.request_id
        ),
    }
}
