//! Telemetry tap: forwards the telemetry channel slice of the engine output
//! to an external sink, one multi-channel sample per audio frame.

use crate::buffer::FlatBuffer;
use crate::layout::ChannelLayout;

/// External telemetry/scope sink. `values` always has exactly the telemetry
/// channel count from the session layout. `Send` so a session can move onto
/// an audio thread.
pub trait TelemetrySink: Send {
    fn log_sample(&mut self, values: &[f32]);
}

/// Sink that discards everything, for sessions without a scope attached.
#[derive(Debug, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn log_sample(&mut self, _values: &[f32]) {}
}

/// Extracts the telemetry channel range per frame into a preallocated row.
#[derive(Debug)]
pub struct TelemetryTap {
    first_channel: usize,
    scratch: Vec<f32>,
}

impl TelemetryTap {
    pub fn new(layout: &ChannelLayout) -> Self {
        Self {
            first_channel: layout.first_telemetry_channel,
            scratch: vec![0.0; layout.telemetry_channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.scratch.len()
    }

    /// Log every frame of the block. No-op when no telemetry channels exist.
    pub fn log_block(&mut self, output: &FlatBuffer, sink: &mut dyn TelemetrySink) {
        if self.scratch.is_empty() {
            return;
        }
        for frame in 0..output.frames() {
            for (offset, slot) in self.scratch.iter_mut().enumerate() {
                *slot = output.get(self.first_channel + offset, frame);
            }
            sink.log_sample(&self.scratch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::HardwareConfig;

    struct Capture {
        rows: Vec<Vec<f32>>,
    }

    impl TelemetrySink for Capture {
        fn log_sample(&mut self, values: &[f32]) {
            self.rows.push(values.to_vec());
        }
    }

    fn layout_with_telemetry() -> ChannelLayout {
        let hw = HardwareConfig {
            sample_rate: 44_100.0,
            audio_frames: 4,
            analog_frames: 2,
            digital_frames: 4,
            audio_in_channels: 2,
            audio_out_channels: 2,
            analog_in_channels: 8,
            analog_out_channels: 8,
            digital_channels: 16,
            multiplexer_channels: 0,
        };
        crate::layout::plan(&hw, 10, 28, true).unwrap()
    }

    #[test]
    fn logs_one_row_per_frame_with_exact_channel_count() {
        let layout = layout_with_telemetry();
        assert_eq!(layout.telemetry_channels, 2);

        let mut output = FlatBuffer::new(layout.engine_output_channels, 4);
        for frame in 0..4 {
            output.set(layout.first_telemetry_channel, frame, frame as f32);
            output.set(layout.first_telemetry_channel + 1, frame, -(frame as f32));
        }

        let mut tap = TelemetryTap::new(&layout);
        let mut sink = Capture { rows: Vec::new() };
        tap.log_block(&output, &mut sink);

        assert_eq!(sink.rows.len(), 4);
        for (frame, row) in sink.rows.iter().enumerate() {
            assert_eq!(row.as_slice(), &[frame as f32, -(frame as f32)]);
        }
    }

    #[test]
    fn no_telemetry_channels_means_no_calls() {
        let hw = HardwareConfig {
            sample_rate: 44_100.0,
            audio_frames: 4,
            analog_frames: 0,
            digital_frames: 0,
            audio_in_channels: 2,
            audio_out_channels: 2,
            analog_in_channels: 0,
            analog_out_channels: 0,
            digital_channels: 0,
            multiplexer_channels: 0,
        };
        let layout = crate::layout::plan(&hw, 2, 2, false).unwrap();
        let output = FlatBuffer::new(layout.engine_output_channels, 4);
        let mut tap = TelemetryTap::new(&layout);
        let mut sink = Capture { rows: Vec::new() };
        tap.log_block(&output, &mut sink);
        assert!(sink.rows.is_empty());
    }
}
