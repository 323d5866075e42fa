use std::sync::Arc;

use crate::analyser::AnalyserRoleConfig;
use crate::audio_context::{AudioContext, AudioStream};
use crate::level_extractor::LevelExtractor;

/// Logical role of an audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Mic,
    Agent,
}

/// Per-role ownership of level extractors
///
/// At most one binding exists per role. Rebinding a role tears the previous
/// extractor's signal path down synchronously before the new one is created,
/// so a stale extractor can never report energy for a stream that has been
/// replaced.
pub struct StreamBindings {
    mic: Option<LevelExtractor>,
    agent: Option<LevelExtractor>,
}

impl StreamBindings {
    pub fn new() -> Self {
        Self {
            mic: None,
            agent: None,
        }
    }

    fn slot(&mut self, role: StreamRole) -> &mut Option<LevelExtractor> {
        match role {
            StreamRole::Mic => &mut self.mic,
            StreamRole::Agent => &mut self.agent,
        }
    }

    /// Attach an extractor for `role` to `stream`.
    ///
    /// A setup failure leaves the role unbound and is reported to the
    /// caller; the role then contributes level 0 like any missing stream.
    pub fn bind(
        &mut self,
        role: StreamRole,
        ctx: Arc<AudioContext>,
        stream: AudioStream,
    ) -> Result<(), anyhow::Error> {
        self.unbind(role);

        let config = AnalyserRoleConfig::for_role(role);
        let extractor = LevelExtractor::new(ctx, stream, config)?;
        *self.slot(role) = Some(extractor);
        Ok(())
    }

    /// Tear down the extractor for `role`, if any. Safe to repeat.
    pub fn unbind(&mut self, role: StreamRole) {
        if let Some(mut extractor) = self.slot(role).take() {
            extractor.teardown();
        }
    }

    /// Tear down both roles. Used on total disconnect.
    pub fn clear(&mut self) {
        self.unbind(StreamRole::Mic);
        self.unbind(StreamRole::Agent);
    }

    pub fn is_bound(&self, role: StreamRole) -> bool {
        match role {
            StreamRole::Mic => self.mic.is_some(),
            StreamRole::Agent => self.agent.is_some(),
        }
    }

    /// Recompute and return the current level for one role.
    ///
    /// An unbound role is a steady state, not an error, and reads 0.
    pub fn poll(&mut self, role: StreamRole) -> f32 {
        match self.slot(role) {
            Some(extractor) => extractor.poll_level(),
            None => 0.0,
        }
    }

    /// Recompute both levels for the current frame.
    pub fn poll_levels(&mut self) -> (f32, f32) {
        (self.poll(StreamRole::Mic), self.poll(StreamRole::Agent))
    }
}

impl Default for StreamBindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_samples(count: usize, amplitude: f32) -> Vec<f32> {
        (0..count)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 8.0 * i as f32 / 256.0).sin())
            .collect()
    }

    #[test]
    fn test_unbound_roles_read_zero() {
        let mut bindings = StreamBindings::new();
        assert_eq!(bindings.poll_levels(), (0.0, 0.0));
        assert!(!bindings.is_bound(StreamRole::Mic));
        assert!(!bindings.is_bound(StreamRole::Agent));
    }

    #[test]
    fn test_bound_role_reports_signal() {
        let ctx = AudioContext::new(48000);
        let stream = AudioStream::new(1024);
        stream.push_samples(&tone_samples(512, 0.5));

        let mut bindings = StreamBindings::new();
        bindings
            .bind(StreamRole::Agent, ctx, stream)
            .unwrap();

        let mut agent_level = 0.0;
        for _ in 0..10 {
            let (_, level) = bindings.poll_levels();
            agent_level = level;
        }
        assert!(agent_level > 0.0);
        assert_eq!(bindings.poll(StreamRole::Mic), 0.0);
    }

    #[test]
    fn test_rebind_tears_down_previous_extractor_first() {
        let ctx = AudioContext::new(48000);
        let first = AudioStream::new(1024);
        let second = AudioStream::new(1024);

        let mut bindings = StreamBindings::new();
        bindings
            .bind(StreamRole::Agent, ctx.clone(), first.clone())
            .unwrap();
        assert_eq!(first.tap_count(), 1);

        bindings
            .bind(StreamRole::Agent, ctx, second.clone())
            .unwrap();
        assert_eq!(first.tap_count(), 0);
        assert_eq!(second.tap_count(), 1);
    }

    #[test]
    fn test_unbind_resets_level_and_is_idempotent() {
        let ctx = AudioContext::new(48000);
        let stream = AudioStream::new(1024);
        stream.push_samples(&tone_samples(512, 0.5));

        let mut bindings = StreamBindings::new();
        bindings
            .bind(StreamRole::Mic, ctx, stream.clone())
            .unwrap();
        for _ in 0..10 {
            bindings.poll(StreamRole::Mic);
        }

        bindings.unbind(StreamRole::Mic);
        assert_eq!(stream.tap_count(), 0);
        assert_eq!(bindings.poll(StreamRole::Mic), 0.0);

        bindings.unbind(StreamRole::Mic);
        assert_eq!(stream.tap_count(), 0);
    }

    #[test]
    fn test_clear_drops_both_bindings() {
        let ctx = AudioContext::new(48000);
        let mic = AudioStream::new(1024);
        let agent = AudioStream::new(1024);

        let mut bindings = StreamBindings::new();
        bindings
            .bind(StreamRole::Mic, ctx.clone(), mic.clone())
            .unwrap();
        bindings
            .bind(StreamRole::Agent, ctx, agent.clone())
            .unwrap();

        bindings.clear();
        assert_eq!(mic.tap_count(), 0);
        assert_eq!(agent.tap_count(), 0);
        assert_eq!(bindings.poll_levels(), (0.0, 0.0));
    }

    #[test]
    fn test_failed_bind_leaves_role_unbound() {
        let ctx = AudioContext::new(48000);
        ctx.close();
        let stream = AudioStream::new(1024);

        let mut bindings = StreamBindings::new();
        assert!(bindings
            .bind(StreamRole::Mic, ctx, stream.clone())
            .is_err());
        assert!(!bindings.is_bound(StreamRole::Mic));
        assert_eq!(stream.tap_count(), 0);
        assert_eq!(bindings.poll(StreamRole::Mic), 0.0);
    }
}
