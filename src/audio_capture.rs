use portaudio as pa;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio_context::AudioStream;
use crate::config::read_app_config;

/// Microphone capture front-end using PortAudio
///
/// The capture callback only pushes samples into the mic stream's ring
/// buffer; all analysis happens on the frame loop. A capture that is
/// stopped (or dropped) releases its PortAudio stream, so a torn-down
/// session can never push stale samples.
pub struct AudioCapture {
    pa_stream: Option<pa::Stream<pa::NonBlocking, pa::Input<f32>>>,
}

impl AudioCapture {
    pub fn new() -> Self {
        Self { pa_stream: None }
    }

    /// Open the default input device and start delivering samples.
    ///
    /// # Arguments
    /// * `stream` - Ring buffer the callback writes raw samples into
    /// * `running` - Atomic flag indicating whether the app is running
    ///
    /// # Returns
    /// Result indicating success or error
    pub fn start(
        &mut self,
        stream: AudioStream,
        running: Arc<AtomicBool>,
    ) -> Result<(), anyhow::Error> {
        let config = read_app_config();

        let pa = pa::PortAudio::new()
            .map_err(|e| anyhow::anyhow!("Failed to initialize PortAudio: {}", e))?;

        let input_params = pa
            .default_input_stream_params::<f32>(1)
            .map_err(|e| anyhow::anyhow!("Failed to get default input parameters: {}", e))?;
        let input_settings = pa::InputStreamSettings::new(
            input_params,
            config.sample_rate as f64,
            config.buffer_size as u32,
        );

        let callback = move |pa::InputStreamCallbackArgs { buffer, .. }| {
            stream.push_samples(buffer);
            if running.load(Ordering::Relaxed) {
                pa::Continue
            } else {
                pa::Complete
            }
        };

        let mut pa_stream = pa
            .open_non_blocking_stream(input_settings, callback)
            .map_err(|e| anyhow::anyhow!("Failed to open capture stream: {}", e))?;

        pa_stream
            .start()
            .map_err(|e| anyhow::anyhow!("Failed to start capture stream: {}", e))?;

        self.pa_stream = Some(pa_stream);
        Ok(())
    }

    /// Stop capture and release the PortAudio stream. Safe to repeat;
    /// once stopped, the mic ring buffer receives no further samples.
    pub fn stop(&mut self) {
        if let Some(stream) = self.pa_stream.as_mut() {
            if let Err(e) = stream.stop() {
                eprintln!("Failed to stop capture stream: {}", e);
            }
            if let Err(e) = stream.close() {
                eprintln!("Failed to close capture stream: {}", e);
            }
            self.pa_stream = None;
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
