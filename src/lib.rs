pub mod analyser;
pub mod audio_capture;
pub mod audio_context;
pub mod config;
pub mod frame_scheduler;
pub mod level_extractor;
pub mod level_reporter;
pub mod stream_bindings;
pub mod ui;
pub mod voice_activity;
pub mod voice_session;

// Re-export key components for easier access
pub use analyser::{AnalyserRoleConfig, SpectrumAnalyser};
pub use audio_capture::AudioCapture;
pub use audio_context::{AudioContext, AudioStream};
pub use config::read_app_config;
pub use level_extractor::LevelExtractor;
pub use level_reporter::LevelReporter;
pub use stream_bindings::{StreamBindings, StreamRole};
pub use voice_activity::{derive_mode, ActivitySnapshot, ActivityTracker, InteractionMode};
pub use voice_session::{ConnectionState, VoiceSession};
