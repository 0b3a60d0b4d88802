//! Per-block sample routing between hardware channel families and the
//! engine's flat buffers.
//!
//! The input pass de-interleaves hardware reads into the channel-major input
//! buffer; the output pass mirrors it back after processing, applying the
//! tremolo post-filter to the audio range. Analog channels run at a
//! sub-multiple of the audio rate, so their frame index is the audio frame
//! divided by `frames_per_analog_frame`. Channels past audio+analog belong to
//! the digital/telemetry/routing ranges and are never touched here.

use crate::buffer::FlatBuffer;
use crate::hardware::{HardwareConfig, HardwareIo};
use crate::layout::ChannelLayout;
use crate::tremolo::TremoloEnvelope;

/// Owns the engine-facing flat buffers for the session and moves samples
/// between them and the hardware, one block at a time.
#[derive(Debug)]
pub struct BlockRouter {
    layout: ChannelLayout,
    input: FlatBuffer,
    output: FlatBuffer,
}

impl BlockRouter {
    pub fn new(layout: ChannelLayout, frames: usize) -> Self {
        Self {
            layout,
            input: FlatBuffer::new(layout.engine_input_channels, frames),
            output: FlatBuffer::new(layout.engine_output_channels, frames),
        }
    }

    pub fn input(&self) -> &FlatBuffer {
        &self.input
    }

    pub fn output(&self) -> &FlatBuffer {
        &self.output
    }

    /// Split borrow for the engine call: input read-only, output writable.
    pub fn engine_buffers(&mut self) -> (&[f32], &mut [f32]) {
        (self.input.as_slice(), self.output.as_mut_slice())
    }

    /// Fill the engine input buffer from hardware reads. Channels without a
    /// hardware counterpart (engine inputs past the hardware count) keep
    /// their previous contents untouched — buffer space is reserved for them
    /// but their values come from elsewhere.
    pub fn read_inputs(&mut self, hardware: &dyn HardwareIo, config: &HardwareConfig) {
        let routable = self
            .layout
            .engine_input_channels
            .min(self.layout.audio_channels + self.layout.analog_channels);
        let fpa = self.layout.frames_per_analog_frame;

        for frame in 0..self.input.frames() {
            for ch in 0..routable {
                if ch >= self.layout.audio_channels {
                    let analog_ch = ch - self.layout.audio_channels;
                    if analog_ch < config.analog_in_channels && fpa > 0 {
                        let sample = hardware.analog_read(frame / fpa, analog_ch);
                        self.input.set(ch, frame, sample);
                    }
                } else if ch < config.audio_in_channels {
                    self.input.set(ch, frame, hardware.audio_read(frame, ch));
                }
            }
        }
    }

    /// Distribute the engine output buffer to hardware writes, advancing the
    /// tremolo envelope once per audio frame and scaling the audio range by
    /// it. Analog channels write through rate-matched and unscaled.
    pub fn write_outputs(
        &mut self,
        hardware: &mut dyn HardwareIo,
        config: &HardwareConfig,
        tremolo: &mut TremoloEnvelope,
    ) {
        let routable = self
            .layout
            .engine_output_channels
            .min(self.layout.audio_channels + self.layout.analog_channels);
        let fpa = self.layout.frames_per_analog_frame;

        for frame in 0..self.output.frames() {
            let gain = tremolo.next();
            for ch in 0..routable {
                if ch >= self.layout.audio_channels {
                    let analog_ch = ch - self.layout.audio_channels;
                    if analog_ch < config.analog_out_channels && fpa > 0 {
                        let sample = self.output.get(ch, frame);
                        hardware.analog_write_once(frame / fpa, analog_ch, sample);
                    }
                } else if ch < config.audio_out_channels {
                    let sample = self.output.get(ch, frame) * gain;
                    hardware.audio_write(frame, ch, sample);
                }
            }
        }
    }
}
