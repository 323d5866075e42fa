use crate::voice_activity::InteractionMode;

// Asymmetric energy envelope: fast attack so onsets read immediately,
// slow decay so releases fall off smoothly
pub const EMA_ATTACK: f32 = 0.18;
pub const EMA_DECAY: f32 = 0.04;

// Color transitions intentionally lag level transitions
pub const COLOR_BLEND: f32 = 0.04;

/// Amplified level response. The quadratic term boosts small signals into
/// visible motion while the curve stays within [0,1] headroom.
pub fn amp(level: f32) -> f32 {
    level * level * 0.5 + level * 0.5
}

/// Color in hue (degrees), saturation and lightness (percent)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    /// Brighter variant used for the foreground core stroke
    pub fn core_highlight(&self) -> Hsl {
        Hsl {
            h: self.h,
            s: (self.s + 20.0).min(100.0),
            l: (self.l + 15.0).min(97.0),
        }
    }

    /// Convert to linear-range RGB components in [0,1]
    pub fn to_rgb(&self) -> [f32; 3] {
        let h = self.h.rem_euclid(360.0);
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let hp = h / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let m = l - c / 2.0;
        [r1 + m, g1 + m, b1 + m]
    }
}

/// Target color for each interaction mode
pub fn target_color(mode: InteractionMode) -> Hsl {
    match mode {
        InteractionMode::Disconnected => Hsl { h: 190.0, s: 15.0, l: 50.0 },
        InteractionMode::Idle => Hsl { h: 190.0, s: 55.0, l: 72.0 },
        InteractionMode::UserSpeaking => Hsl { h: 188.0, s: 65.0, l: 80.0 },
        InteractionMode::AgentSpeaking => Hsl { h: 178.0, s: 60.0, l: 75.0 },
    }
}

/// Base opacity for each interaction mode
pub fn base_alpha(mode: InteractionMode) -> f32 {
    match mode {
        InteractionMode::Disconnected => 0.2,
        InteractionMode::Idle => 0.5,
        InteractionMode::UserSpeaking => 0.85,
        InteractionMode::AgentSpeaking => 0.9,
    }
}

/// Smoothed state the renderer draws from, advanced once per tick
///
/// Owns the energy envelope and the blended color explicitly, so the
/// per-tick update is a pure function of (previous state, mode, level).
pub struct AuraModel {
    smoothed_rms: f32,
    color: Hsl,
    mode: InteractionMode,
}

impl AuraModel {
    pub fn new() -> Self {
        Self {
            smoothed_rms: 0.0,
            color: target_color(InteractionMode::Disconnected),
            mode: InteractionMode::Disconnected,
        }
    }

    /// Advance one frame from the current activity snapshot.
    pub fn advance(&mut self, mode: InteractionMode, raw_rms: f32) {
        // Entering the disconnected mode clears the envelope outright
        if mode == InteractionMode::Disconnected && self.mode != InteractionMode::Disconnected {
            self.smoothed_rms = 0.0;
        }

        let factor = if raw_rms > self.smoothed_rms {
            EMA_ATTACK
        } else {
            EMA_DECAY
        };
        self.smoothed_rms += (raw_rms - self.smoothed_rms) * factor;

        let target = target_color(mode);
        self.color.h += (target.h - self.color.h) * COLOR_BLEND;
        self.color.s += (target.s - self.color.s) * COLOR_BLEND;
        self.color.l += (target.l - self.color.l) * COLOR_BLEND;

        self.mode = mode;
    }

    pub fn smoothed_rms(&self) -> f32 {
        self.smoothed_rms
    }

    pub fn color(&self) -> Hsl {
        self.color
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn alpha(&self) -> f32 {
        base_alpha(self.mode)
    }
}

impl Default for AuraModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-layer drawing parameters for the concentric rings
#[derive(Debug, Clone, Copy)]
pub struct LayerParams {
    pub offset: f32,
    pub alpha: f32,
    pub radius: f32,
}

pub fn layer_params(layer: usize, base_alpha: f32, base_radius: f32) -> LayerParams {
    LayerParams {
        offset: layer as f32 * 0.5,
        alpha: base_alpha * (1.0 - layer as f32 * 0.25),
        radius: base_radius + layer as f32 * 3.0,
    }
}

/// Opacity of the filled ribbon band
pub fn fill_alpha(layer_alpha: f32, amp: f32) -> f32 {
    layer_alpha * (0.4 + amp * 0.5)
}

/// Opacity of the foreground core stroke
pub fn core_alpha(layer_alpha: f32, amp: f32) -> f32 {
    layer_alpha * (0.7 + amp * 0.3)
}

/// Line width of the foreground core stroke
pub fn core_width(amp: f32) -> f32 {
    1.5 + amp * 5.0
}

/// One sample on a ring centerline: position plus local ribbon thickness
#[derive(Debug, Clone, Copy)]
pub struct RingPoint {
    pub x: f32,
    pub y: f32,
    pub thickness: f32,
}

/// Generate one closed ring of centerline samples for a layer.
///
/// Each point's radial offset is a sum of sinusoidal warps at different
/// angular frequencies and phase velocities, every term scaled up by the
/// amplified energy, so louder audio makes the ring larger, faster and
/// thicker. All angular frequencies are integers, so the point at 2pi
/// coincides with the point at 0 and the ring closes exactly.
pub fn build_ring_points(
    cx: f32,
    cy: f32,
    base_radius: f32,
    t: f32,
    rms: f32,
    layer_offset: f32,
    segments: usize,
) -> Vec<RingPoint> {
    let amp = amp(rms);
    let mut points = Vec::with_capacity(segments + 1);

    for i in 0..=segments {
        let theta = i as f32 / segments as f32 * std::f32::consts::TAU;

        // Time speeds up with audio, so the ring animates faster when
        // someone is speaking
        let speed_mult = 1.0 + amp * 3.0;
        let st = t * speed_mult;

        let warp1 = (theta * 3.0 + st * 0.8 + layer_offset).sin() * (6.0 + amp * 60.0);
        let warp2 = (theta * 5.0 - st * 0.6 + layer_offset * 2.0).sin() * (3.0 + amp * 35.0);
        let warp3 = (theta * 2.0 + st * 1.1 + layer_offset).cos() * (5.0 + amp * 45.0);
        let warp4 = (theta * 7.0 + st * 1.5 + layer_offset * 0.7).sin() * (amp * 20.0);
        let breathe = (t * 0.5 + layer_offset).sin() * (3.0 + amp * 15.0);

        let r = base_radius + warp1 + warp2 + warp3 + warp4 + breathe + amp * 50.0;

        // Ribbon twist and depth fold shape the cross-section so the band
        // reads as a folded ribbon instead of a flat line
        let twist = (theta * 2.0 + st * 0.7 + layer_offset).sin() * 0.5 + 0.5;
        let fold = (theta * 3.0 - st * 0.9 + layer_offset * 1.5).sin() * 0.4 + 0.6;
        let thickness = (4.0 + amp * 40.0) * twist * fold + 2.0;

        points.push(RingPoint {
            x: cx + theta.cos() * r,
            y: cy + theta.sin() * r,
            thickness,
        });
    }

    points
}

/// Tessellate a ring into a filled band.
///
/// Each centerline point is offset along its local perpendicular by half
/// its thickness in both directions. The result is a triangle-strip vertex
/// sequence (outer edge and inner edge interleaved) whose last pair equals
/// its first pair, so the band closes without a seam.
pub fn ribbon_band(points: &[RingPoint]) -> Vec<[f32; 2]> {
    let n = points.len();
    let mut verts = Vec::with_capacity(n * 2);

    for i in 0..n {
        let p = points[i];
        // The final point duplicates the first, so its successor is the
        // second point, which keeps the seam normal identical to the
        // first normal
        let next = if i + 1 < n { points[i + 1] } else { points[1 % n] };
        let dx = next.x - p.x;
        let dy = next.y - p.y;
        let len = (dx * dx + dy * dy).sqrt().max(1e-6);
        let nx = -dy / len;
        let ny = dx / len;
        let hw = p.thickness / 2.0;

        verts.push([p.x + nx * hw, p.y + ny * hw]);
        verts.push([p.x - nx * hw, p.y - ny * hw]);
    }

    verts
}

/// Tessellate the undisplaced centerline as a constant-width stroke band.
pub fn stroke_band(points: &[RingPoint], width: f32) -> Vec<[f32; 2]> {
    let stroke_points: Vec<RingPoint> = points
        .iter()
        .map(|p| RingPoint {
            x: p.x,
            y: p.y,
            thickness: width,
        })
        .collect();
    ribbon_band(&stroke_points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    #[test]
    fn test_amp_endpoints() {
        assert_eq!(amp(0.0), 0.0);
        assert!((amp(1.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_amp_is_monotonically_non_decreasing() {
        let mut prev = amp(0.0);
        for i in 1..=100 {
            let level = i as f32 / 100.0;
            let a = amp(level);
            assert!(a >= prev, "amp decreased at level {}", level);
            prev = a;
        }
    }

    #[test]
    fn test_envelope_converges_upward_without_overshoot() {
        let mut model = AuraModel::new();
        let target = 0.8;
        let mut prev = model.smoothed_rms();
        for _ in 0..200 {
            model.advance(InteractionMode::AgentSpeaking, target);
            let v = model.smoothed_rms();
            assert!(v >= prev, "smoothed level fell while rising");
            assert!(v <= target + EPS, "smoothed level overshot target");
            prev = v;
        }
        assert!((model.smoothed_rms() - target).abs() < 0.01);
    }

    #[test]
    fn test_envelope_converges_downward_without_overshoot() {
        let mut model = AuraModel::new();
        for _ in 0..200 {
            model.advance(InteractionMode::AgentSpeaking, 0.8);
        }

        let target = 0.1;
        let mut prev = model.smoothed_rms();
        for _ in 0..400 {
            model.advance(InteractionMode::AgentSpeaking, target);
            let v = model.smoothed_rms();
            assert!(v <= prev, "smoothed level rose while falling");
            assert!(v >= target - EPS, "smoothed level undershot target");
            prev = v;
        }
        assert!((model.smoothed_rms() - target).abs() < 0.01);
    }

    #[test]
    fn test_attack_is_faster_than_decay() {
        let mut rising = AuraModel::new();
        rising.advance(InteractionMode::AgentSpeaking, 1.0);
        let rise_step = rising.smoothed_rms();

        let mut falling = AuraModel::new();
        for _ in 0..500 {
            falling.advance(InteractionMode::AgentSpeaking, 1.0);
        }
        let before = falling.smoothed_rms();
        falling.advance(InteractionMode::AgentSpeaking, 0.0);
        let fall_step = before - falling.smoothed_rms();

        assert!(rise_step > fall_step);
    }

    #[test]
    fn test_disconnect_entry_resets_envelope() {
        let mut model = AuraModel::new();
        for _ in 0..50 {
            model.advance(InteractionMode::UserSpeaking, 0.7);
        }
        assert!(model.smoothed_rms() > 0.3);

        model.advance(InteractionMode::Disconnected, 0.0);
        assert_eq!(model.smoothed_rms(), 0.0);
    }

    #[test]
    fn test_color_converges_to_mode_target() {
        let mut model = AuraModel::new();
        for _ in 0..500 {
            model.advance(InteractionMode::AgentSpeaking, 0.0);
        }
        let color = model.color();
        let target = target_color(InteractionMode::AgentSpeaking);
        assert!((color.h - target.h).abs() < 0.5);
        assert!((color.s - target.s).abs() < 0.5);
        assert!((color.l - target.l).abs() < 0.5);
    }

    #[test]
    fn test_color_lags_mode_change() {
        let mut model = AuraModel::new();
        model.advance(InteractionMode::AgentSpeaking, 0.0);
        let color = model.color();
        let start = target_color(InteractionMode::Disconnected);
        let target = target_color(InteractionMode::AgentSpeaking);
        // One frame of blending moves only a fraction of the distance
        assert!((color.s - start.s).abs() < (target.s - start.s).abs() / 2.0);
    }

    #[test]
    fn test_hsl_to_rgb_known_values() {
        let red = Hsl { h: 0.0, s: 100.0, l: 50.0 }.to_rgb();
        assert!((red[0] - 1.0).abs() < EPS && red[1] < EPS && red[2] < EPS);

        let white = Hsl { h: 120.0, s: 50.0, l: 100.0 }.to_rgb();
        for c in white {
            assert!((c - 1.0).abs() < EPS);
        }

        let gray = Hsl { h: 240.0, s: 0.0, l: 50.0 }.to_rgb();
        for c in gray {
            assert!((c - 0.5).abs() < EPS);
        }
    }

    #[test]
    fn test_core_highlight_caps_saturation_and_lightness() {
        let bright = Hsl { h: 190.0, s: 95.0, l: 90.0 }.core_highlight();
        assert_eq!(bright.s, 100.0);
        assert_eq!(bright.l, 97.0);
    }

    #[test]
    fn test_ring_closes_for_small_and_large_segment_counts() {
        for segments in [3, 5, 16, 128] {
            for (t, rms) in [(0.0, 0.0), (12.3, 0.4), (100.7, 1.0)] {
                let points =
                    build_ring_points(200.0, 150.0, 80.0, t, rms, 0.5, segments);
                assert_eq!(points.len(), segments + 1);
                let first = points[0];
                let last = points[segments];
                assert!(
                    (first.x - last.x).abs() < 1e-2 && (first.y - last.y).abs() < 1e-2,
                    "ring did not close for segments={} t={} rms={}",
                    segments,
                    t,
                    rms
                );
                assert!((first.thickness - last.thickness).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn test_ring_thickness_is_positive() {
        let points = build_ring_points(0.0, 0.0, 100.0, 42.0, 1.0, 1.0, 64);
        for p in &points {
            assert!(p.thickness > 0.0);
        }
    }

    #[test]
    fn test_higher_energy_grows_the_ring() {
        // Compare the mean radius at silence and at full level
        let quiet = build_ring_points(0.0, 0.0, 100.0, 1.0, 0.0, 0.0, 128);
        let loud = build_ring_points(0.0, 0.0, 100.0, 1.0, 1.0, 0.0, 128);

        let mean_r = |points: &[RingPoint]| {
            points
                .iter()
                .map(|p| (p.x * p.x + p.y * p.y).sqrt())
                .sum::<f32>()
                / points.len() as f32
        };
        assert!(mean_r(&loud) > mean_r(&quiet) + 20.0);
    }

    #[test]
    fn test_ribbon_band_closes_and_pairs_every_point() {
        let points = build_ring_points(100.0, 100.0, 50.0, 3.0, 0.5, 0.0, 32);
        let band = ribbon_band(&points);
        assert_eq!(band.len(), points.len() * 2);

        let n = band.len();
        for (a, b) in [(band[0], band[n - 2]), (band[1], band[n - 1])] {
            assert!((a[0] - b[0]).abs() < 1e-2 && (a[1] - b[1]).abs() < 1e-2);
        }
    }

    #[test]
    fn test_stroke_band_has_constant_width() {
        let points = build_ring_points(0.0, 0.0, 80.0, 7.0, 0.3, 0.5, 64);
        let width = 4.0;
        let band = stroke_band(&points, width);
        for pair in band.chunks_exact(2) {
            let dx = pair[0][0] - pair[1][0];
            let dy = pair[0][1] - pair[1][1];
            let dist = (dx * dx + dy * dy).sqrt();
            assert!((dist - width).abs() < 1e-3);
        }
    }

    #[test]
    fn test_layer_params_follow_layer_index() {
        let base = layer_params(0, 0.8, 100.0);
        assert_eq!(base.offset, 0.0);
        assert_eq!(base.alpha, 0.8);
        assert_eq!(base.radius, 100.0);

        let second = layer_params(2, 0.8, 100.0);
        assert_eq!(second.offset, 1.0);
        assert!((second.alpha - 0.4).abs() < EPS);
        assert_eq!(second.radius, 106.0);
    }
}
