use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle state of the shared audio-processing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Closed,
}

/// Shared audio-processing context
///
/// Created once per connection attempt and closed on disconnect or error.
/// Analysers check the context state every frame; once closed, no further
/// analysis runs and all extractors report level 0.
pub struct AudioContext {
    sample_rate: u32,
    state: RwLock<ContextState>,
}

impl AudioContext {
    pub fn new(sample_rate: u32) -> Arc<Self> {
        Arc::new(Self {
            sample_rate,
            state: RwLock::new(ContextState::Running),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ContextState::Running
    }

    /// Close the context. Idempotent.
    pub fn close(&self) {
        *self.state.write() = ContextState::Closed;
    }
}

/// Identifier handed out when an analyser taps a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TapId(u64);

struct StreamInner {
    samples: VecDeque<f32>,
    taps: Vec<TapId>,
}

/// Handle to a live audio stream
///
/// The producer side (capture callback, or whatever delivers remote agent
/// audio) pushes time-domain samples into a bounded ring buffer; consumers
/// read the most recent analysis window. Analysers register a tap on setup
/// and must remove it on teardown, so a stream with zero taps is known to
/// have no signal path attached.
#[derive(Clone)]
pub struct AudioStream {
    inner: Arc<Mutex<StreamInner>>,
    capacity: usize,
    next_tap: Arc<AtomicU64>,
}

impl AudioStream {
    /// Create a stream whose ring buffer holds at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StreamInner {
                samples: VecDeque::with_capacity(capacity),
                taps: Vec::new(),
            })),
            capacity,
            next_tap: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append samples, discarding the oldest once over capacity.
    pub fn push_samples(&self, samples: &[f32]) {
        let mut inner = self.inner.lock();
        inner.samples.extend(samples.iter().copied());
        let len = inner.samples.len();
        if len > self.capacity {
            inner.samples.drain(0..len - self.capacity);
        }
    }

    /// Copy the most recent `out.len()` samples into `out`, oldest first.
    ///
    /// If fewer samples are buffered, the front of `out` is zero-filled and
    /// `false` is returned.
    pub fn latest_window(&self, out: &mut [f32]) -> bool {
        let inner = self.inner.lock();
        let have = inner.samples.len();
        let want = out.len();
        if have >= want {
            for (dst, src) in out.iter_mut().zip(inner.samples.iter().skip(have - want)) {
                *dst = *src;
            }
            true
        } else {
            let pad = want - have;
            out[..pad].fill(0.0);
            for (dst, src) in out[pad..].iter_mut().zip(inner.samples.iter()) {
                *dst = *src;
            }
            false
        }
    }

    /// Register an analysis tap on this stream.
    pub fn connect_tap(&self) -> TapId {
        let id = TapId(self.next_tap.fetch_add(1, Ordering::Relaxed));
        self.inner.lock().taps.push(id);
        id
    }

    /// Remove a previously registered tap. Returns false if the tap was
    /// already removed, so callers can assert single-disconnect.
    pub fn disconnect_tap(&self, id: TapId) -> bool {
        let mut inner = self.inner.lock();
        match inner.taps.iter().position(|t| *t == id) {
            Some(idx) => {
                inner.taps.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn tap_count(&self) -> usize {
        self.inner.lock().taps.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_close_is_idempotent() {
        let ctx = AudioContext::new(48000);
        assert!(ctx.is_running());
        ctx.close();
        assert_eq!(ctx.state(), ContextState::Closed);
        ctx.close();
        assert_eq!(ctx.state(), ContextState::Closed);
    }

    #[test]
    fn test_ring_buffer_trims_to_capacity() {
        let stream = AudioStream::new(4);
        stream.push_samples(&[1.0, 2.0, 3.0]);
        assert_eq!(stream.len(), 3);
        stream.push_samples(&[4.0, 5.0, 6.0]);
        assert_eq!(stream.len(), 4);

        let mut out = [0.0; 4];
        assert!(stream.latest_window(&mut out));
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_latest_window_zero_fills_short_buffer() {
        let stream = AudioStream::new(8);
        stream.push_samples(&[0.5, 0.25]);

        let mut out = [1.0; 4];
        assert!(!stream.latest_window(&mut out));
        assert_eq!(out, [0.0, 0.0, 0.5, 0.25]);
    }

    #[test]
    fn test_tap_disconnects_exactly_once() {
        let stream = AudioStream::new(8);
        let a = stream.connect_tap();
        let b = stream.connect_tap();
        assert_eq!(stream.tap_count(), 2);

        assert!(stream.disconnect_tap(a));
        assert!(!stream.disconnect_tap(a));
        assert_eq!(stream.tap_count(), 1);

        assert!(stream.disconnect_tap(b));
        assert_eq!(stream.tap_count(), 0);
    }

    #[test]
    fn test_cloned_handles_share_buffer_and_taps() {
        let stream = AudioStream::new(8);
        let other = stream.clone();
        other.push_samples(&[0.1, 0.2]);
        assert_eq!(stream.len(), 2);

        let tap = other.connect_tap();
        assert_eq!(stream.tap_count(), 1);
        assert!(stream.disconnect_tap(tap));
        assert_eq!(other.tap_count(), 0);
    }
}
