use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio_capture::AudioCapture;
use crate::audio_context::{AudioContext, AudioStream};
use crate::config::AppConfig;
use crate::stream_bindings::{StreamBindings, StreamRole};

/// Connection state of the voice session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Ring buffer headroom over the capture block size, so the analysis
/// window always finds enough recent samples
const STREAM_CAPACITY_BLOCKS: usize = 4;

/// Session boundary for the visualization core
///
/// Owns the shared audio context, the microphone capture front-end, and
/// the per-role stream bindings. Lives on the event-loop thread with the
/// renderer; [`poll_mic`](Self::poll_mic) runs once per frame to finish
/// microphone acquisition without blocking the frame loop. Remote agent
/// audio arrives through [`set_agent_stream`](Self::set_agent_stream) as
/// tracks appear and disappear on the conferencing side.
pub struct VoiceSession {
    config: AppConfig,
    state: Arc<RwLock<ConnectionState>>,
    status_text: Arc<RwLock<String>>,
    bindings: Arc<Mutex<StreamBindings>>,
    running: Arc<AtomicBool>,
    ctx: Option<Arc<AudioContext>>,
    capture: Option<AudioCapture>,
    mic_stream: Option<AudioStream>,
    agent_stream: Option<AudioStream>,
    // Deadline for the first mic samples; None once acquisition settled
    mic_deadline: Option<Instant>,
}

impl VoiceSession {
    pub fn new(config: AppConfig, running: Arc<AtomicBool>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            status_text: Arc::new(RwLock::new(String::new())),
            bindings: Arc::new(Mutex::new(StreamBindings::new())),
            running,
            ctx: None,
            capture: None,
            mic_stream: None,
            agent_stream: None,
            mic_deadline: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn state_handle(&self) -> Arc<RwLock<ConnectionState>> {
        self.state.clone()
    }

    pub fn status_handle(&self) -> Arc<RwLock<String>> {
        self.status_text.clone()
    }

    pub fn bindings_handle(&self) -> Arc<Mutex<StreamBindings>> {
        self.bindings.clone()
    }

    pub fn mic_stream(&self) -> Option<&AudioStream> {
        self.mic_stream.as_ref()
    }

    pub fn agent_stream(&self) -> Option<&AudioStream> {
        self.agent_stream.as_ref()
    }

    fn set_status(&self, text: &str) {
        *self.status_text.write() = text.to_string();
        if !text.is_empty() {
            println!("{}", text);
        }
    }

    /// Establish the session.
    ///
    /// Creates the audio context (in direct response to the user's connect
    /// action) and starts microphone capture. A capture failure is a hard
    /// failure: the state becomes `Error` and the context is closed. The
    /// microphone binding itself is finished by [`poll_mic`](Self::poll_mic)
    /// once the first samples arrive; a mic that never delivers any is not
    /// an error, and the session stays connected without a mic binding.
    pub fn connect(&mut self) -> Result<()> {
        if self.state() == ConnectionState::Connected {
            return Ok(());
        }

        *self.state.write() = ConnectionState::Connecting;
        self.set_status("Connecting...");

        let ctx = AudioContext::new(self.config.sample_rate as u32);
        let mic_stream = AudioStream::new(self.config.buffer_size * STREAM_CAPACITY_BLOCKS);

        let mut capture = AudioCapture::new();
        if let Err(e) = capture.start(mic_stream.clone(), self.running.clone()) {
            eprintln!("Connection failed: {}", e);
            ctx.close();
            *self.state.write() = ConnectionState::Error;
            self.set_status("Connection failed");
            return Err(e);
        }

        self.capture = Some(capture);
        self.ctx = Some(ctx);
        self.mic_stream = Some(mic_stream);
        self.mic_deadline =
            Some(Instant::now() + Duration::from_secs(self.config.mic_timeout_secs));
        *self.state.write() = ConnectionState::Connected;
        self.set_status("Waiting for microphone...");
        Ok(())
    }

    /// Finish pending microphone acquisition. Runs once per frame.
    ///
    /// Binds the mic role as soon as the capture callback has delivered
    /// samples; past the deadline the mic is declared unavailable and the
    /// session keeps running with the role unbound.
    pub fn poll_mic(&mut self) {
        let Some(deadline) = self.mic_deadline else {
            return;
        };
        let (Some(ctx), Some(stream)) = (self.ctx.clone(), self.mic_stream.clone()) else {
            self.mic_deadline = None;
            return;
        };

        if !stream.is_empty() {
            self.mic_deadline = None;
            if let Err(e) = self.bindings.lock().bind(StreamRole::Mic, ctx, stream) {
                eprintln!("Failed to attach mic analyser: {}", e);
            }
            self.set_status("Listening...");
        } else if Instant::now() >= deadline {
            self.mic_deadline = None;
            eprintln!(
                "Microphone unavailable: no samples within {}s",
                self.config.mic_timeout_secs
            );
            if let Some(mut capture) = self.capture.take() {
                capture.stop();
            }
            self.mic_stream = None;
            self.set_status("Connected (mic unavailable). You can still receive agent audio.");
        }
    }

    /// Bind or unbind the remote agent stream.
    ///
    /// Called by the conferencing side as agent audio tracks subscribe and
    /// unsubscribe. Rebinding with a new stream tears the old extractor
    /// down first.
    pub fn set_agent_stream(&mut self, stream: Option<AudioStream>) {
        match stream {
            Some(stream) => {
                let Some(ctx) = self.ctx.clone() else {
                    eprintln!("No audio context; ignoring agent stream");
                    return;
                };
                self.agent_stream = Some(stream.clone());
                if let Err(e) = self.bindings.lock().bind(StreamRole::Agent, ctx, stream) {
                    eprintln!("Failed to attach agent analyser: {}", e);
                    return;
                }
                self.set_status("Agent is speaking...");
            }
            None => {
                self.agent_stream = None;
                self.bindings.lock().unbind(StreamRole::Agent);
                if self.state() == ConnectionState::Connected {
                    self.set_status("Listening...");
                }
            }
        }
    }

    /// Connect or disconnect depending on the current state.
    pub fn toggle_connection(&mut self) {
        match self.state() {
            ConnectionState::Disconnected | ConnectionState::Error => {
                if let Err(e) = self.connect() {
                    eprintln!("Connection failed: {}", e);
                }
            }
            ConnectionState::Connected | ConnectionState::Connecting => {
                self.disconnect();
            }
        }
    }

    /// Tear the session down: all bindings cleared, capture stopped, the
    /// context closed, levels back to 0. Safe to call in any state.
    pub fn disconnect(&mut self) {
        self.bindings.lock().clear();
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(ctx) = self.ctx.take() {
            ctx.close();
        }
        self.mic_stream = None;
        self.agent_stream = None;
        self.mic_deadline = None;
        *self.state.write() = ConnectionState::Disconnected;
        self.set_status("");
    }
}
