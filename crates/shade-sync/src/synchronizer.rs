//! Config synchronizer.
//!
//! Owns the local mirror of the device status and configuration for one
//! connection session and keeps it consistent with the device:
//!
//! ```text
//! Unloaded --load--> Loading --ok--> Ready --reload--> Reloading --ok--> Ready
//!     ^                 |                                   |
//!     +-----failed------+            Ready <----failed------+
//!
//! any --disconnect or channel closed--> Stale --load--> Loading
//! ```
//!
//! Every load and disconnect starts a new generation. Results of requests
//! issued under an older generation are never written into the mirror.

use std::fmt;

use bytes::Bytes;
use parking_lot::Mutex;
use shade_protocol::{
    encode_value, Controls, DeviceConfig, DeviceStatus, PacketCategory, PacketType, StatusField,
    Telemetry, Value, ValueError, ValueKind,
};
use shade_schema::{PropertyKey, Schema, SchemaError, Snapshot, UiType};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::error::{ChannelError, SyncError};
use crate::metrics::metric_defs;

/// Lifecycle phase of a [`Synchronizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing has been loaded yet.
    Unloaded,
    /// First load in progress.
    Loading,
    /// Status and configuration mirror the device.
    Ready,
    /// Reload from `Ready` in progress.
    Reloading,
    /// The connection went away; values must not be trusted.
    Stale,
}

impl Phase {
    pub fn is_loading(self) -> bool {
        matches!(self, Phase::Loading | Phase::Reloading)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Unloaded => "unloaded",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Reloading => "reloading",
            Phase::Stale => "stale",
        })
    }
}

#[derive(Debug)]
struct State {
    phase: Phase,
    generation: u64,
    status: DeviceStatus,
    config: DeviceConfig,
    controls: Controls,
    /// Status fetched by the running load, with telemetry merged since.
    staged_status: Option<DeviceStatus>,
}

/// Restores the prior phase if a load future is dropped before it settles.
struct LoadGuard<'a> {
    state: &'a Mutex<State>,
    generation: u64,
    prior: Phase,
    settled: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock();
        if state.generation == self.generation {
            state.phase = self.prior;
            state.staged_status = None;
            debug!("Load {} cancelled", self.generation);
        }
    }
}

impl State {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            config: self.config.clone(),
            controls: self.controls,
        }
    }
}

/// Client-side mirror of one device session.
///
/// All methods take `&self`; a synchronizer can be shared between tasks.
/// Loads are serialized, field applies may overlap.
pub struct Synchronizer<C> {
    channel: C,
    schema: Schema,
    state: Mutex<State>,
}

impl<C: Channel> Synchronizer<C> {
    pub fn new(channel: C, schema: Schema) -> Self {
        Synchronizer {
            channel,
            schema,
            state: Mutex::new(State {
                phase: Phase::Unloaded,
                generation: 0,
                status: DeviceStatus::default(),
                config: DeviceConfig::default(),
                controls: Controls::default(),
                staged_status: None,
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Fetch the device status, then its configuration.
    ///
    /// The configuration request is only sent once the status has been
    /// decoded. Both trees are replaced together when the configuration
    /// decodes; on any failure the previous phase and values are kept.
    pub async fn load(&self) -> Result<(), SyncError> {
        let (generation, prior) = {
            let mut state = self.state.lock();
            if state.phase.is_loading() {
                return Err(SyncError::LoadInProgress);
            }
            let next = match state.phase {
                Phase::Ready => Phase::Reloading,
                _ => Phase::Loading,
            };
            let prior = std::mem::replace(&mut state.phase, next);
            state.generation += 1;
            state.staged_status = None;
            (state.generation, prior)
        };
        debug!("Load {} started from {}", generation, prior);
        let mut guard = LoadGuard {
            state: &self.state,
            generation,
            prior,
            settled: false,
        };

        let result = self.fetch(generation).await;

        let mut state = self.state.lock();
        guard.settled = true;
        if state.generation != generation {
            // Disconnected while loading; the disconnect already set the phase.
            return match result {
                Ok(_) => Err(SyncError::Disconnected {
                    command: PacketType::GetConfig,
                }),
                Err(e) => Err(e),
            };
        }

        let staged = state.staged_status.take();
        match result {
            Ok((status, config)) => {
                state.status = staged.unwrap_or(status);
                state.config = config;
                state.phase = Phase::Ready;
                metrics::counter!(metric_defs::LOADS_COMPLETED.name).increment(1);
                info!("Load {} complete", generation);
                Ok(())
            }
            Err(e) => {
                state.phase = prior;
                warn!("Load {} failed: {}", generation, e);
                Err(e)
            }
        }
    }

    /// Reload from `Ready`.
    pub async fn reload(&self) -> Result<(), SyncError> {
        let phase = self.phase();
        if phase != Phase::Ready {
            return Err(SyncError::NotReady { phase });
        }
        self.load().await
    }

    async fn fetch(&self, generation: u64) -> Result<(DeviceStatus, DeviceConfig), SyncError> {
        let payload = self.send(PacketType::GetState, Bytes::new()).await?;
        let status = DeviceStatus::decode(&payload)?;
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return Err(SyncError::Disconnected {
                    command: PacketType::GetState,
                });
            }
            state.staged_status = Some(status);
        }

        let payload = self.send(PacketType::GetConfig, Bytes::new()).await?;
        let config = self.schema.decode_config(&payload)?;
        Ok((status, config))
    }

    /// Mark the session as gone.
    ///
    /// Pending loads and applies started before this call will not touch
    /// the mirror when they complete.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        state.phase = Phase::Stale;
        state.generation += 1;
        state.staged_status = None;
        info!("Disconnected, state is stale");
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Copy of the status, configuration and controls.
    pub fn snapshot(&self) -> Result<Snapshot, SyncError> {
        let state = self.state.lock();
        match state.phase {
            Phase::Ready => Ok(state.snapshot()),
            phase => Err(SyncError::NotReady { phase }),
        }
    }

    pub fn status(&self) -> Result<DeviceStatus, SyncError> {
        self.snapshot().map(|s| s.status)
    }

    pub fn config(&self) -> Result<DeviceConfig, SyncError> {
        self.snapshot().map(|s| s.config)
    }

    /// Current value of a dotted key.
    pub fn value(&self, key: &str) -> Result<Option<Value>, SyncError> {
        let snapshot = self.snapshot()?;
        Ok(self.schema.current_value(key, &snapshot)?)
    }

    pub fn is_visible(&self, key: &str) -> Result<bool, SyncError> {
        let snapshot = self.snapshot()?;
        Ok(self.schema.is_visible(key, &snapshot)?)
    }

    // ========================================================================
    // Applying
    // ========================================================================

    /// Send a new value for `key` and patch the mirror once acknowledged.
    pub async fn apply_property(&self, key: &str, value: Value) -> Result<(), SyncError> {
        let key: PropertyKey = key.parse()?;
        self.apply(key, value).await
    }

    /// Parse `input` for `key`, then apply it.
    pub async fn apply_input(&self, key: &str, input: &str) -> Result<(), SyncError> {
        let value = self.schema.parse_input(key, input)?;
        self.apply_property(key, value).await
    }

    /// Apply a value to a typed key.
    ///
    /// The value is coerced to the field's kind and sent with the field's
    /// apply command. The mirror is patched only when the device
    /// acknowledges and no load or disconnect happened in between. An ack
    /// that arrives after a reload or disconnect returns
    /// [`SyncError::Superseded`]. On any failure the stored value is
    /// unchanged.
    pub async fn apply(&self, key: PropertyKey, value: Value) -> Result<(), SyncError> {
        let target = self.schema.apply_target(key)?;
        let invalid = |source| SchemaError::InvalidValue { key, source };
        let value = value.coerce(target.kind).map_err(invalid)?;
        if let (Value::Text(text), Some(max)) = (&value, self.schema.field(key)?.max_length()) {
            // Refuse rather than let the device truncate.
            if text.len() > max {
                return Err(invalid(ValueError::InvalidInput {
                    kind: target.kind,
                    input: text.clone(),
                })
                .into());
            }
        }
        let payload = encode_value(target.kind, &value).map_err(invalid)?;

        let generation = self.ready_generation()?;
        debug!("Applying {} = {}", key, value);

        match self.send(target.command, payload).await {
            Ok(_) => {}
            Err(SyncError::Channel(ChannelError::Rejected(reason))) => {
                return Err(SyncError::ApplyRejected { key, reason });
            }
            Err(e) => return Err(e),
        }

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("Not patching {}: state changed while applying", key);
            return Err(SyncError::Superseded { key });
        }
        let patched = match key {
            PropertyKey::Config(field) => state.config.set(field, value),
            PropertyKey::Control(field) => state.controls.set(field, value),
            PropertyKey::Status(_) | PropertyKey::Action(_) => {
                return Err(SchemaError::ReadOnly(key).into())
            }
        };
        patched.map_err(invalid)?;
        Ok(())
    }

    /// Press a button or flip a toggle.
    ///
    /// Buttons send their command with an empty payload. Boolean trigger
    /// fields such as `power` are applied with the inverse of their current
    /// value.
    pub async fn trigger(&self, key: &str) -> Result<(), SyncError> {
        let key: PropertyKey = key.parse()?;

        if let PropertyKey::Action(_) = key {
            let command = self.schema.trigger_command(key)?;
            return match self.send(command, Bytes::new()).await {
                Err(SyncError::Channel(ChannelError::Rejected(reason))) => {
                    Err(SyncError::ApplyRejected { key, reason })
                }
                other => other.map(|_| ()),
            };
        }

        let field = self.schema.field(key)?;
        if field.ui != UiType::Trigger {
            return Err(SchemaError::NotDataBound(key).into());
        }
        let current = {
            let state = self.state.lock();
            match state.phase {
                Phase::Ready => key.value_in(&state.snapshot()),
                phase => return Err(SyncError::NotReady { phase }),
            }
        };
        let next = !current.map(|v| v.is_truthy()).unwrap_or(false);
        self.apply(key, Value::Bool(next)).await
    }

    /// Send a device action that has no schema entry (`STOP`, `RESTART`,
    /// `APPLY_OFFSET`, ...).
    pub async fn action(&self, command: PacketType) -> Result<(), SyncError> {
        if command.category() != PacketCategory::Action {
            return Err(SyncError::NotAnAction(command));
        }
        self.send(command, Bytes::new()).await.map(|_| ())
    }

    /// Ask the device to move to `percent` of its open position.
    ///
    /// The target is clamped to 0-100. The device homes first if needed and
    /// reports progress through telemetry, so the mirror is not patched here.
    pub async fn move_to(&self, percent: f32) -> Result<(), SyncError> {
        let key = PropertyKey::Status(StatusField::PositionTarget);
        let invalid = |source| SchemaError::InvalidValue { key, source };
        if percent.is_nan() {
            return Err(invalid(ValueError::InvalidInput {
                kind: ValueKind::Float32,
                input: percent.to_string(),
            })
            .into());
        }
        let target = percent.clamp(0.0, 100.0);
        let payload = encode_value(ValueKind::Float32, &Value::F32(target)).map_err(invalid)?;

        debug!("Moving to {}%", target);
        match self.send(PacketType::PositionTarget, payload).await {
            Err(SyncError::Channel(ChannelError::Rejected(reason))) => {
                Err(SyncError::ApplyRejected { key, reason })
            }
            other => other.map(|_| ()),
        }
    }

    // ========================================================================
    // Telemetry
    // ========================================================================

    /// Merge a telemetry push into the status.
    ///
    /// A running load keeps its fetched status current as well, so the
    /// update is not lost when the load commits.
    pub fn apply_telemetry(&self, update: &Telemetry) {
        let mut state = self.state.lock();
        if state.phase == Phase::Stale {
            return;
        }
        update.apply(&mut state.status);
        if let Some(staged) = state.staged_status.as_mut() {
            update.apply(staged);
        }
        metrics::counter!(metric_defs::TELEMETRY_MERGED.name).increment(1);
        debug!("Telemetry {}", update);
    }

    /// Merge telemetry from `updates` until the sender closes, then mark
    /// the state stale.
    pub async fn follow(&self, mut updates: broadcast::Receiver<Telemetry>) {
        loop {
            match updates.recv().await {
                Ok(update) => self.apply_telemetry(&update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Telemetry lagged, skipped {} updates", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        self.disconnect();
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn ready_generation(&self) -> Result<u64, SyncError> {
        let state = self.state.lock();
        match state.phase {
            Phase::Ready => Ok(state.generation),
            phase => Err(SyncError::NotReady { phase }),
        }
    }

    /// Issue one request, recording metrics and mapping timeouts.
    async fn send(&self, command: PacketType, payload: Bytes) -> Result<Bytes, SyncError> {
        metrics::counter!(metric_defs::REQUESTS_SENT.name, "command" => command.name()).increment(1);

        match self.channel.request(command, payload).await {
            Ok(payload) => Ok(payload),
            Err(ChannelError::Timeout) => {
                metrics::counter!(metric_defs::REQUEST_TIMEOUTS.name, "command" => command.name())
                    .increment(1);
                warn!("{} timed out", command);
                Err(SyncError::RequestTimeout { command })
            }
            Err(ChannelError::Decode(e)) => Err(SyncError::Decode(e)),
            Err(ChannelError::Closed) => {
                self.disconnect();
                Err(SyncError::Disconnected { command })
            }
            Err(ChannelError::Rejected(reason)) => {
                metrics::counter!(metric_defs::APPLY_REJECTIONS.name, "command" => command.name())
                    .increment(1);
                warn!("{} rejected: {}", command, reason);
                Err(ChannelError::Rejected(reason).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
