use anyhow::anyhow;
use std::sync::Arc;

use crate::analyser::{rms_level, AnalyserRoleConfig, SpectrumAnalyser};
use crate::audio_context::{AudioContext, AudioStream, TapId};

/// Continuously sampled energy level for one audio stream
///
/// Owns the signal path from the raw stream into the spectrum analyser: a
/// tap registered on the stream plus the role-specific gain applied inside
/// the analyser. [`poll_level`](Self::poll_level) is called once per
/// animation frame; consumers read the resulting scalar in [0,1].
pub struct LevelExtractor {
    ctx: Arc<AudioContext>,
    stream: AudioStream,
    analyser: SpectrumAnalyser,
    tap: Option<TapId>,
    window: Vec<f32>,
    level: f32,
}

impl LevelExtractor {
    /// Wire a stream into a new analyser.
    ///
    /// Fails if the shared context is already closed; callers are expected
    /// to log the error and treat the role's level as 0.
    pub fn new(
        ctx: Arc<AudioContext>,
        stream: AudioStream,
        config: AnalyserRoleConfig,
    ) -> Result<Self, anyhow::Error> {
        if !ctx.is_running() {
            return Err(anyhow!("audio context is closed"));
        }

        let analyser = SpectrumAnalyser::new(config);
        let window = vec![0.0; analyser.fft_size()];
        let tap = stream.connect_tap();

        Ok(Self {
            ctx,
            stream,
            analyser,
            tap: Some(tap),
            window,
            level: 0.0,
        })
    }

    /// Recompute the level from the most recent analysis window.
    ///
    /// Reports 0 without analysing when the context has closed or the
    /// signal path has been torn down.
    pub fn poll_level(&mut self) -> f32 {
        if self.tap.is_none() || !self.ctx.is_running() {
            self.level = 0.0;
            return 0.0;
        }

        self.stream.latest_window(&mut self.window);
        let bins = self.analyser.analyse(&self.window);
        self.level = rms_level(bins);
        self.level
    }

    /// Most recently polled level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Disconnect the signal path. Safe to call repeatedly; the tap is
    /// removed exactly once.
    pub fn teardown(&mut self) {
        if let Some(tap) = self.tap.take() {
            self.stream.disconnect_tap(tap);
        }
        self.level = 0.0;
    }
}

impl Drop for LevelExtractor {
    fn drop(&mut self) {
        self.teardown();
    }
}
