//! Slow periodic envelope applied to the audio output path.
//!
//! A sine at a patch-controlled rate, evaluated once per audio frame. Peak
//! amplitude is fixed at 0.5 centered on zero, so the post-filtered output
//! never exceeds half the unfiltered engine output.

use std::f32::consts::TAU;

/// Fixed peak amplitude of the envelope.
pub const TREMOLO_DEPTH: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct TremoloEnvelope {
    phase: f32,
    rate_hz: f32,
    inverse_sample_rate: f32,
}

impl TremoloEnvelope {
    pub fn new(sample_rate: f32, rate_hz: f32) -> Self {
        Self {
            phase: 0.0,
            rate_hz,
            inverse_sample_rate: 1.0 / sample_rate,
        }
    }

    /// Change the rate. Takes effect on the next frame with no interpolation;
    /// the resulting discontinuity is tolerated by design.
    pub fn set_rate(&mut self, rate_hz: f32) {
        self.rate_hz = rate_hz;
    }

    pub fn rate(&self) -> f32 {
        self.rate_hz
    }

    /// Current envelope value, then advance the phase by one audio frame.
    /// The phase always stays within `[0, 2π)` so it cannot drift over long
    /// sessions.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let value = self.phase.sin() * TREMOLO_DEPTH;
        self.phase += TAU * self.rate_hz * self.inverse_sample_rate;
        if !(0.0..TAU).contains(&self.phase) {
            self.phase = self.phase.rem_euclid(TAU);
        }
        value
    }
}
