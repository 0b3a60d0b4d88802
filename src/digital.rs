//! Digital line dispatch.
//!
//! Digital lines are owned by an external line manager that tracks, per
//! channel, whether the line is an input or output and whether it runs at
//! message rate (discrete updates) or signal rate (one sample per frame).
//! This module defines that collaborator's seam plus the two pieces of
//! per-block digital work the core does itself: copying signal-rate output
//! channels from the engine buffer to the hardware, and driving the
//! multiplexer address lines.

use crate::buffer::FlatBuffer;
use crate::hardware::HardwareIo;
use crate::layout::ChannelLayout;

/// Direction of a managed digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineDirection {
    Input,
    Output,
}

/// External digital-line manager. Mode can change between messages, so the
/// per-line queries must be checked per frame, not cached per block. `Send`
/// so a session can move onto an audio thread.
pub trait DigitalLineManager: Send {
    /// Start managing a line with the given direction and rate. Replaces any
    /// previous configuration for that channel.
    fn manage(&mut self, channel: usize, direction: LineDirection, message_rate: bool);

    /// Stop managing a line; all dispatch for it ceases immediately.
    fn unmanage(&mut self, channel: usize);

    fn is_output(&self, channel: usize) -> bool;
    fn is_signal_rate(&self, channel: usize) -> bool;

    /// Latch a message-rate output value, written back on `process_output`.
    fn set_value(&mut self, channel: usize, value: bool);

    /// Scan message-rate inputs for the block. The manager decides per line
    /// whether to react; `events` fires once per line whose level changed,
    /// with the channel index and new level.
    fn process_input(
        &mut self,
        hardware: &dyn HardwareIo,
        frames: usize,
        events: &mut dyn FnMut(usize, bool),
    );

    /// Write latched message-rate output values for the block.
    fn process_output(&mut self, hardware: &mut dyn HardwareIo, frames: usize);
}

/// Copy signal-rate digital output channels from the engine output buffer to
/// per-frame hardware writes. A line is written only while the manager
/// reports it as both output and signal rate at that frame; samples above 0.5
/// read as high.
pub fn write_signal_rate_outputs(
    manager: &dyn DigitalLineManager,
    hardware: &mut dyn HardwareIo,
    output: &FlatBuffer,
    layout: &ChannelLayout,
    digital_frames: usize,
) {
    let frames = output.frames().min(digital_frames);
    for frame in 0..frames {
        for line in 0..layout.digital_signal_out_channels {
            if manager.is_signal_rate(line) && manager.is_output(line) {
                let sample = output.get(layout.first_digital_channel + line, frame);
                hardware.digital_write_once(frame, line, sample > 0.5);
            }
        }
    }
}

/// Number of address lines driving the external multiplexer.
pub const ADDRESS_LINES: usize = 3;

/// Drive digital lines 0..2 with a 3-bit cyclic select pattern derived from
/// the digital frame index, keeping the external multiplexer in lock-step
/// with the block's frame count.
pub fn write_address_lines(hardware: &mut dyn HardwareIo, digital_frames: usize) {
    for frame in 0..digital_frames {
        hardware.digital_write(frame, 0, frame & 4 != 0);
        hardware.digital_write(frame, 1, frame & 2 != 0);
        hardware.digital_write(frame, 2, frame & 1 != 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PatternRecorder {
        writes: Vec<(usize, usize, bool)>,
    }

    impl HardwareIo for PatternRecorder {
        fn audio_read(&self, _: usize, _: usize) -> f32 {
            0.0
        }
        fn audio_write(&mut self, _: usize, _: usize, _: f32) {}
        fn analog_read(&self, _: usize, _: usize) -> f32 {
            0.0
        }
        fn analog_write_once(&mut self, _: usize, _: usize, _: f32) {}
        fn digital_read(&self, _: usize, _: usize) -> bool {
            false
        }
        fn digital_write(&mut self, frame: usize, channel: usize, value: bool) {
            self.writes.push((frame, channel, value));
        }
        fn digital_write_once(&mut self, frame: usize, channel: usize, value: bool) {
            self.writes.push((frame, channel, value));
        }
        fn multiplexer_analog_in(&self) -> &[f32] {
            &[]
        }
    }

    #[test]
    fn address_pattern_counts_through_eight_states() {
        let mut hw = PatternRecorder { writes: Vec::new() };
        write_address_lines(&mut hw, 16);
        for frame in 0..16 {
            let bits: Vec<bool> = hw
                .writes
                .iter()
                .filter(|(f, _, _)| *f == frame)
                .map(|&(_, _, v)| v)
                .collect();
            let select = (bits[0] as usize) << 2 | (bits[1] as usize) << 1 | bits[2] as usize;
            assert_eq!(select, frame % 8);
        }
    }
}
