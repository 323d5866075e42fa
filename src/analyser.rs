use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Arc;

use crate::stream_bindings::StreamRole;

// Analysis window constants shared by both roles
const FFT_SIZE: usize = 256; // 128 magnitude bins
const BIN_SMOOTHING: f32 = 0.7; // Temporal blend applied to bin magnitudes

// Decibel range used to normalize bin magnitudes. The mic range is widened
// and paired with a pre-analysis gain because local capture runs much
// quieter than the decoded agent track.
const MIC_GAIN: f32 = 4.0;
const MIC_DB_FLOOR: f32 = -90.0;
const MIC_DB_CEILING: f32 = -10.0;
const AGENT_DB_FLOOR: f32 = -100.0;
const AGENT_DB_CEILING: f32 = -30.0;

// Magnitudes at or below this are treated as silence in the dB conversion
const DB_EPSILON: f32 = 1e-10;

/// Per-role analysis settings, selected once at extractor construction
#[derive(Debug, Clone)]
pub struct AnalyserRoleConfig {
    /// Gain applied to the raw samples before analysis
    pub gain: f32,
    /// Decibel value mapped to a normalized bin value of 0
    pub db_floor: f32,
    /// Decibel value mapped to a normalized bin value of 1
    pub db_ceiling: f32,
    /// Analysis window size in samples
    pub fft_size: usize,
    /// Temporal smoothing coefficient for bin magnitudes (0..1)
    pub smoothing: f32,
}

impl AnalyserRoleConfig {
    pub fn mic() -> Self {
        Self {
            gain: MIC_GAIN,
            db_floor: MIC_DB_FLOOR,
            db_ceiling: MIC_DB_CEILING,
            fft_size: FFT_SIZE,
            smoothing: BIN_SMOOTHING,
        }
    }

    pub fn agent() -> Self {
        Self {
            gain: 1.0,
            db_floor: AGENT_DB_FLOOR,
            db_ceiling: AGENT_DB_CEILING,
            fft_size: FFT_SIZE,
            smoothing: BIN_SMOOTHING,
        }
    }

    pub fn for_role(role: StreamRole) -> Self {
        match role {
            StreamRole::Mic => Self::mic(),
            StreamRole::Agent => Self::agent(),
        }
    }
}

/// Frequency-magnitude analyser for one audio stream
///
/// Each call to [`analyse`](Self::analyse) consumes one window of
/// time-domain samples and produces normalized bin magnitudes in [0,1]:
/// gain, Hann window, forward FFT, per-bin temporal smoothing, then dB
/// mapping over the role's decibel range.
pub struct SpectrumAnalyser {
    config: AnalyserRoleConfig,
    fft: Arc<dyn rustfft::Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
    smoothed_mags: Vec<f32>,
    bins: Vec<f32>,
}

impl SpectrumAnalyser {
    pub fn new(config: AnalyserRoleConfig) -> Self {
        let fft_size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Hann window coefficients, precomputed once. Reduces spectral
        // leakage: 0.5 * (1 - cos(2π * i / (N-1)))
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (fft_size - 1) as f32).cos())
            })
            .collect();

        let bin_count = fft_size / 2;
        Self {
            config,
            fft,
            fft_buffer: vec![Complex { re: 0.0, im: 0.0 }; fft_size],
            window,
            smoothed_mags: vec![0.0; bin_count],
            bins: vec![0.0; bin_count],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.config.fft_size / 2
    }

    /// Process one window of samples and return the normalized bins.
    ///
    /// `samples` must contain exactly `fft_size` samples, oldest first.
    pub fn analyse(&mut self, samples: &[f32]) -> &[f32] {
        debug_assert_eq!(samples.len(), self.config.fft_size);

        let gain = self.config.gain;
        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            *slot = Complex {
                re: samples[i] * gain * self.window[i],
                im: 0.0,
            };
        }
        self.fft.process(&mut self.fft_buffer);

        let scale = 1.0 / self.config.fft_size as f32;
        let smoothing = self.config.smoothing;
        let db_floor = self.config.db_floor;
        let db_range = self.config.db_ceiling - self.config.db_floor;

        for k in 0..self.bins.len() {
            let mag = self.fft_buffer[k].norm() * scale;

            // Temporal smoothing keeps the magnitude snapshot from
            // flickering frame to frame
            let smoothed = smoothing * self.smoothed_mags[k] + (1.0 - smoothing) * mag;
            self.smoothed_mags[k] = smoothed;

            let db = 20.0 * smoothed.max(DB_EPSILON).log10();
            self.bins[k] = ((db - db_floor) / db_range).clamp(0.0, 1.0);
        }

        &self.bins
    }

    /// Drop all smoothed magnitude history.
    pub fn reset(&mut self) {
        self.smoothed_mags.fill(0.0);
        self.bins.fill(0.0);
    }
}

/// RMS energy of a normalized bin snapshot: sqrt(mean(bin^2))
pub fn rms_level(bins: &[f32]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: f32 = bins.iter().map(|v| v * v).sum();
    (sum / bins.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(fft_size: usize, cycles: f32, amplitude: f32) -> Vec<f32> {
        (0..fft_size)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * cycles * i as f32 / fft_size as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_silence_reports_zero_level() {
        let mut analyser = SpectrumAnalyser::new(AnalyserRoleConfig::agent());
        let silence = vec![0.0; analyser.fft_size()];
        let bins = analyser.analyse(&silence);
        assert!(bins.iter().all(|&b| b == 0.0));
        assert_eq!(rms_level(bins), 0.0);
    }

    #[test]
    fn test_tone_reports_positive_level() {
        let mut analyser = SpectrumAnalyser::new(AnalyserRoleConfig::agent());
        let tone = sine(analyser.fft_size(), 8.0, 0.5);
        // Run a few windows so the temporal smoothing settles
        let mut level = 0.0;
        for _ in 0..10 {
            level = rms_level(analyser.analyse(&tone));
        }
        assert!(level > 0.0);
    }

    #[test]
    fn test_bins_stay_normalized() {
        let mut analyser = SpectrumAnalyser::new(AnalyserRoleConfig::mic());
        let loud = sine(analyser.fft_size(), 8.0, 1.0);
        for _ in 0..10 {
            let bins = analyser.analyse(&loud);
            assert!(bins.iter().all(|&b| (0.0..=1.0).contains(&b)));
        }
    }

    #[test]
    fn test_gain_raises_level_for_quiet_input() {
        let gained = AnalyserRoleConfig::mic();
        let ungained = AnalyserRoleConfig {
            gain: 1.0,
            ..AnalyserRoleConfig::mic()
        };
        let mut with_gain = SpectrumAnalyser::new(gained);
        let mut without_gain = SpectrumAnalyser::new(ungained);

        let quiet = sine(FFT_SIZE, 8.0, 0.01);
        let mut level_gain = 0.0;
        let mut level_plain = 0.0;
        for _ in 0..10 {
            level_gain = rms_level(with_gain.analyse(&quiet));
            level_plain = rms_level(without_gain.analyse(&quiet));
        }
        assert!(level_gain > level_plain);
    }

    #[test]
    fn test_smoothing_converges_on_constant_input() {
        let mut analyser = SpectrumAnalyser::new(AnalyserRoleConfig::agent());
        let tone = sine(analyser.fft_size(), 8.0, 0.5);

        let mut last = 0.0;
        for _ in 0..40 {
            let level = rms_level(analyser.analyse(&tone));
            assert!(level >= last);
            last = level;
        }

        let settled = rms_level(analyser.analyse(&tone));
        assert!((settled - last).abs() < 1e-3);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut analyser = SpectrumAnalyser::new(AnalyserRoleConfig::agent());
        let tone = sine(analyser.fft_size(), 8.0, 0.5);
        analyser.analyse(&tone);
        analyser.reset();

        let silence = vec![0.0; analyser.fft_size()];
        assert_eq!(rms_level(analyser.analyse(&silence)), 0.0);
    }
}
