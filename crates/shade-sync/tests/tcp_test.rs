//! TcpChannel tests against a fake device on a loopback socket.

use std::time::Duration;

use bytes::Bytes;
use shade_protocol::{
    DeviceConfig, DeviceStatus, FrameCodec, Packet, PacketType, Telemetry, PUSH_REQUEST_ID,
};
use shade_schema::Schema;
use shade_sync::{
    Channel, ChannelError, ChannelOptions, Phase, SyncError, Synchronizer, TcpChannel,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const TIMEOUT: Duration = Duration::from_millis(500);

// ============================================================================
// Fake Device
// ============================================================================

/// Device side of the connection: reads request frames, writes responses.
struct FakeDevice {
    stream: TcpStream,
    codec: FrameCodec,
}

impl FakeDevice {
    async fn next_request(&mut self) -> Packet {
        let mut buf = [0u8; 256];
        loop {
            if let Some(packet) = self.codec.decode().unwrap() {
                return packet;
            }
            let n = self.stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed the connection");
            self.codec.push(&buf[..n]);
        }
    }

    async fn send(&mut self, packet: Packet) {
        let frame = packet.encode().unwrap();
        self.stream.write_all(&frame).await.unwrap();
    }

    async fn respond(&mut self, request: &Packet, payload: impl Into<Bytes>) {
        self.send(Packet::new(request.request_id, request.packet_type, payload))
            .await;
    }
}

async fn connect() -> (TcpChannel, FakeDevice) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let options = ChannelOptions {
        connect_timeout: TIMEOUT,
        request_timeout: TIMEOUT,
    };
    let (channel, accepted) = tokio::join!(
        TcpChannel::connect("127.0.0.1", port, options),
        listener.accept()
    );
    let (stream, _) = accepted.unwrap();
    let device = FakeDevice {
        stream,
        codec: FrameCodec::new(),
    };
    (channel.unwrap(), device)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_request_response() {
    let (channel, mut device) = connect().await;

    let device_task = async {
        let request = device.next_request().await;
        assert_eq!(request.packet_type, PacketType::GetState);
        assert_ne!(request.request_id, PUSH_REQUEST_ID);
        assert!(request.payload.is_empty());
        device.respond(&request, DeviceStatus::default().encode()).await;
    };
    let (response, _) = tokio::join!(
        channel.request(PacketType::GetState, Bytes::new()),
        device_task
    );

    assert_eq!(response.unwrap().len(), 12);
    assert_eq!(channel.pending_requests(), 0);
}

#[tokio::test]
async fn test_responses_matched_by_request_id() {
    let (channel, mut device) = connect().await;

    let device_task = async {
        let first = device.next_request().await;
        let second = device.next_request().await;
        // Answer in reverse order, echoing the request type.
        device.respond(&second, vec![second.packet_type.code()]).await;
        device.respond(&first, vec![first.packet_type.code()]).await;
    };
    let (a, b, _) = tokio::join!(
        channel.request(PacketType::StepperConfigReverse, Bytes::from_static(&[1])),
        channel.request(PacketType::SysConfigMqttEnabled, Bytes::from_static(&[0])),
        device_task
    );

    assert_eq!(a.unwrap()[..], [PacketType::StepperConfigReverse.code()]);
    assert_eq!(b.unwrap()[..], [PacketType::SysConfigMqttEnabled.code()]);
    assert_eq!(channel.pending_requests(), 0);
}

#[tokio::test]
async fn test_error_response_is_rejection() {
    let (channel, mut device) = connect().await;

    let device_task = async {
        let request = device.next_request().await;
        device
            .send(Packet::new(
                request.request_id,
                PacketType::Error,
                &b"not homed"[..],
            ))
            .await;
    };
    let (response, _) = tokio::join!(
        channel.request(PacketType::Open, Bytes::new()),
        device_task
    );

    match response {
        Err(ChannelError::Rejected(reason)) => assert_eq!(reason, "not homed"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_abandons_request() {
    let (channel, mut device) = connect().await;

    let result = channel.request(PacketType::GetConfig, Bytes::new()).await;
    assert!(matches!(result, Err(ChannelError::Timeout)));
    assert_eq!(channel.pending_requests(), 0);

    // The late answer is dropped and the channel keeps working.
    let late = device.next_request().await;
    device.respond(&late, vec![0; 4]).await;

    let device_task = async {
        let request = device.next_request().await;
        device.respond(&request, vec![7]).await;
    };
    let (response, _) = tokio::join!(
        channel.request(PacketType::GetState, Bytes::new()),
        device_task
    );
    assert_eq!(response.unwrap(), Bytes::from_static(&[7]));
}

#[tokio::test]
async fn test_pushes_are_broadcast() {
    let (channel, mut device) = connect().await;
    let mut telemetry = channel.subscribe();

    device
        .send(Packet::push(PacketType::Moving, Telemetry::Moving(true).encode()))
        .await;
    device
        .send(Packet::push(PacketType::Position, Telemetry::Position(-12).encode()))
        .await;

    assert_eq!(telemetry.recv().await.unwrap(), Telemetry::Moving(true));
    assert_eq!(telemetry.recv().await.unwrap(), Telemetry::Position(-12));
}

#[tokio::test]
async fn test_garbage_between_frames_is_skipped() {
    let (channel, mut device) = connect().await;
    let mut telemetry = channel.subscribe();

    device.stream.write_all(&[0x00, 0x13, 0x37]).await.unwrap();
    device
        .send(Packet::push(PacketType::Homed, Telemetry::Homed(true).encode()))
        .await;

    assert_eq!(telemetry.recv().await.unwrap(), Telemetry::Homed(true));
}

#[tokio::test]
async fn test_closed_connection_fails_requests() {
    let (channel, device) = connect().await;
    drop(device);

    // Either the write or the wait observes the close.
    let result = channel.request(PacketType::GetState, Bytes::new()).await;
    assert!(matches!(
        result,
        Err(ChannelError::Closed) | Err(ChannelError::Io(_))
    ));
}

#[tokio::test]
async fn test_telemetry_closes_with_connection() {
    let (channel, mut device) = connect().await;
    let mut telemetry = channel.subscribe();

    device
        .send(Packet::push(PacketType::Homed, Telemetry::Homed(false).encode()))
        .await;
    drop(device);

    assert_eq!(telemetry.recv().await.unwrap(), Telemetry::Homed(false));
    assert!(telemetry.recv().await.is_err());
    assert!(channel.is_closed());
}

/// Answer the GET_STATE and GET_CONFIG requests of one load.
async fn serve_load(device: &mut FakeDevice, status: DeviceStatus) {
    let request = device.next_request().await;
    assert_eq!(request.packet_type, PacketType::GetState);
    device.respond(&request, status.encode()).await;

    let request = device.next_request().await;
    assert_eq!(request.packet_type, PacketType::GetConfig);
    let config = DeviceConfig::factory_defaults().encode().unwrap();
    device.respond(&request, config).await;
}

#[tokio::test]
async fn test_synchronizer_over_tcp() {
    let (channel, mut device) = connect().await;
    let sync = Synchronizer::new(channel, Schema::new().unwrap());

    let status = DeviceStatus {
        homed: true,
        position: 40960,
        ..DeviceStatus::default()
    };
    let (result, _) = tokio::join!(sync.load(), serve_load(&mut device, status));

    result.unwrap();
    assert_eq!(sync.phase(), Phase::Ready);
    assert_eq!(
        sync.schema()
            .display("status.position", &sync.snapshot().unwrap())
            .unwrap()
            .as_deref(),
        Some("40960 (100%)")
    );
}

#[tokio::test]
async fn test_connection_loss_makes_state_stale() {
    let (channel, mut device) = connect().await;
    let telemetry = channel.subscribe();
    let sync = Synchronizer::new(channel, Schema::new().unwrap());

    let (result, _) = tokio::join!(sync.load(), serve_load(&mut device, DeviceStatus::default()));
    result.unwrap();
    assert_eq!(sync.phase(), Phase::Ready);

    drop(device);
    sync.follow(telemetry).await;

    assert_eq!(sync.phase(), Phase::Stale);
    assert!(sync.snapshot().is_err());
    assert!(matches!(
        sync.action(PacketType::Stop).await,
        Err(SyncError::Disconnected {
            command: PacketType::Stop
        })
    ));
}
