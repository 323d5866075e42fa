use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::stream_bindings::StreamBindings;
use crate::voice_session::ConnectionState;

/// Discrete interaction mode driving the aura's color and behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Disconnected,
    Idle,
    UserSpeaking,
    AgentSpeaking,
}

/// Minimum RMS level treated as speech
pub const SPEAKING_THRESHOLD: f32 = 0.02;

/// Derive the interaction mode from the two measured levels.
///
/// Pure and recomputed from scratch every frame; flicker suppression
/// happens on the levels the renderer consumes, not on the mode itself.
/// At equal levels above threshold the agent wins, so overlap (barge-in)
/// keeps showing the agent as the active speaker.
pub fn derive_mode(
    connection: ConnectionState,
    mic_level: f32,
    agent_level: f32,
) -> (InteractionMode, f32) {
    if connection != ConnectionState::Connected {
        return (InteractionMode::Disconnected, 0.0);
    }

    if agent_level > SPEAKING_THRESHOLD && agent_level >= mic_level {
        (InteractionMode::AgentSpeaking, agent_level)
    } else if mic_level > SPEAKING_THRESHOLD {
        (InteractionMode::UserSpeaking, mic_level)
    } else {
        (InteractionMode::Idle, mic_level.max(agent_level))
    }
}

/// Most recent per-frame activity measurement
///
/// Written once per tick by the [`ActivityTracker`] and read by the
/// renderer (and the level reporter) within the same frame; there are no
/// concurrent writers.
#[derive(Debug, Clone, Copy)]
pub struct ActivitySnapshot {
    pub mode: InteractionMode,
    pub dominant_level: f32,
    pub mic_level: f32,
    pub agent_level: f32,
}

impl Default for ActivitySnapshot {
    fn default() -> Self {
        Self {
            mode: InteractionMode::Disconnected,
            dominant_level: 0.0,
            mic_level: 0.0,
            agent_level: 0.0,
        }
    }
}

/// Per-frame bridge from measured levels to the shared snapshot
///
/// Subscribed to the frame scheduler; each tick it polls both extractors
/// through the stream bindings, derives the mode, and publishes the result.
pub struct ActivityTracker {
    bindings: Arc<Mutex<StreamBindings>>,
    connection: Arc<RwLock<ConnectionState>>,
    snapshot: Arc<RwLock<ActivitySnapshot>>,
}

impl ActivityTracker {
    pub fn new(
        bindings: Arc<Mutex<StreamBindings>>,
        connection: Arc<RwLock<ConnectionState>>,
        snapshot: Arc<RwLock<ActivitySnapshot>>,
    ) -> Self {
        Self {
            bindings,
            connection,
            snapshot,
        }
    }

    pub fn snapshot_handle(&self) -> Arc<RwLock<ActivitySnapshot>> {
        self.snapshot.clone()
    }

    /// Recompute the snapshot for the current frame.
    pub fn update(&self) {
        let (mic_level, agent_level) = self.bindings.lock().poll_levels();
        let connection = *self.connection.read();
        let (mode, dominant_level) = derive_mode(connection, mic_level, agent_level);

        *self.snapshot.write() = ActivitySnapshot {
            mode,
            dominant_level,
            mic_level,
            agent_level,
        };
    }
}
