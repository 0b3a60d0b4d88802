//! Channel layout planning.
//!
//! Runs exactly once before block processing starts and never again: the
//! resulting `ChannelLayout` fixes where every channel family lives inside
//! the engine's flat buffers for the whole session. Misconfiguration here is
//! fatal by design — degrading silently at this stage would corrupt every
//! block that follows.

use crate::hardware::HardwareConfig;

/// Historical floor for the first digital channel. Patches written against
/// older hardware address digital lines starting at channel 10 regardless of
/// how many audio/analog channels exist, so the planner never places the
/// digital range below this.
pub const MIN_FIRST_DIGITAL_CHANNEL: usize = 10;

/// Ordered, non-overlapping channel ranges within the engine's flat input and
/// output buffers, plus the derived per-family counts.
///
/// Buffer order is always: audio, analog, digital, telemetry, then any
/// remaining routing channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    /// Audio channels in use: max of hardware in/out counts.
    pub audio_channels: usize,
    /// Analog channels in use: max of hardware in/out counts.
    pub analog_channels: usize,
    /// Digital channels in use (hardware digital line count, or zero when
    /// digital processing is off).
    pub digital_channels: usize,
    pub first_analog_channel: usize,
    pub first_digital_channel: usize,
    /// Offset added to a digital line index to form its receiver number
    /// (`bela_digitalInNN` / `bela_digitalOutNN`).
    pub digital_channel_offset: usize,
    pub first_telemetry_channel: usize,
    /// Engine output channels past the digital range, tapped to telemetry.
    pub telemetry_channels: usize,
    /// Engine input channels in the digital range, driven at signal rate.
    pub digital_signal_in_channels: usize,
    /// Engine output channels in the digital range, read at signal rate.
    pub digital_signal_out_channels: usize,
    /// Union size of all ranges in use.
    pub channels_in_use: usize,
    pub engine_input_channels: usize,
    pub engine_output_channels: usize,
    /// Audio frames per analog frame (zero when the analog family is absent).
    pub frames_per_analog_frame: usize,
}

/// Setup-time layout failures. Any of these must prevent block processing
/// from ever starting.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("block has no audio frames")]
    EmptyBlock,
    #[error("audio frame count {audio} is not a multiple of analog frame count {analog}")]
    AnalogRateMismatch { audio: usize, analog: usize },
}

/// Compute the session channel layout from the hardware dimensions and the
/// engine's reported channel counts.
///
/// `digital_enabled` gates the digital range: when false the digital family
/// occupies no channels and the telemetry range starts right after the
/// digital floor.
pub fn plan(
    hardware: &HardwareConfig,
    engine_input_channels: usize,
    engine_output_channels: usize,
    digital_enabled: bool,
) -> Result<ChannelLayout, LayoutError> {
    if hardware.audio_frames == 0 {
        return Err(LayoutError::EmptyBlock);
    }
    let frames_per_analog_frame = if hardware.analog_frames > 0 {
        if hardware.audio_frames % hardware.analog_frames != 0 {
            return Err(LayoutError::AnalogRateMismatch {
                audio: hardware.audio_frames,
                analog: hardware.analog_frames,
            });
        }
        hardware.audio_frames / hardware.analog_frames
    } else {
        0
    };

    // A family is in use if either direction is populated.
    let audio_channels = hardware.audio_in_channels.max(hardware.audio_out_channels);
    let analog_channels = hardware
        .analog_in_channels
        .max(hardware.analog_out_channels);
    let digital_channels = if digital_enabled {
        hardware.digital_channels
    } else {
        0
    };

    let first_analog_channel = audio_channels;
    let first_digital_channel =
        (first_analog_channel + analog_channels).max(MIN_FIRST_DIGITAL_CHANNEL);
    let digital_channel_offset = first_digital_channel + 1;
    let first_telemetry_channel = first_digital_channel + digital_channels;

    let telemetry_channels = engine_output_channels.saturating_sub(first_telemetry_channel);

    let (digital_signal_in_channels, digital_signal_out_channels) = if digital_enabled {
        let sig_in = engine_input_channels.saturating_sub(first_digital_channel);
        let sig_out = engine_output_channels
            .saturating_sub(first_digital_channel)
            .saturating_sub(telemetry_channels);
        // The engine may declare a wider digital range than the hardware has
        // lines for; clamp rather than overrun, and say so.
        let clamp = |n: usize, dir: &str| {
            if n > digital_channels {
                log::warn!(
                    "engine requests {n} digital {dir} channels, hardware has {digital_channels}; clamping"
                );
                digital_channels
            } else {
                n
            }
        };
        (clamp(sig_in, "input"), clamp(sig_out, "output"))
    } else {
        (0, 0)
    };

    Ok(ChannelLayout {
        audio_channels,
        analog_channels,
        digital_channels,
        first_analog_channel,
        first_digital_channel,
        digital_channel_offset,
        first_telemetry_channel,
        telemetry_channels,
        digital_signal_in_channels,
        digital_signal_out_channels,
        channels_in_use: first_telemetry_channel + telemetry_channels,
        engine_input_channels,
        engine_output_channels,
        frames_per_analog_frame,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hw() -> HardwareConfig {
        HardwareConfig {
            sample_rate: 44_100.0,
            audio_frames: 16,
            analog_frames: 8,
            digital_frames: 16,
            audio_in_channels: 2,
            audio_out_channels: 2,
            analog_in_channels: 8,
            analog_out_channels: 8,
            digital_channels: 16,
            multiplexer_channels: 0,
        }
    }

    #[test]
    fn minimal_config_hits_digital_floor() {
        // audioIn=2, analogIn=0, digital=0 must place digital at the floor.
        let hardware = HardwareConfig {
            analog_frames: 0,
            analog_in_channels: 0,
            analog_out_channels: 0,
            digital_frames: 0,
            digital_channels: 0,
            ..hw()
        };
        let layout = plan(&hardware, 2, 2, false).unwrap();
        assert_eq!(layout.first_analog_channel, 2);
        assert_eq!(layout.first_digital_channel, 10);
        assert_eq!(layout.first_telemetry_channel, 10);
        assert_eq!(layout.telemetry_channels, 0);
    }

    #[test]
    fn ranges_are_ordered_and_tight() {
        let layout = plan(&hw(), 28, 30, true).unwrap();
        assert_eq!(layout.first_analog_channel, layout.audio_channels);
        assert!(
            layout.first_digital_channel >= layout.first_analog_channel + layout.analog_channels
        );
        assert_eq!(
            layout.first_telemetry_channel,
            layout.first_digital_channel + layout.digital_channels
        );
        assert_eq!(
            layout.channels_in_use,
            layout.first_telemetry_channel + layout.telemetry_channels
        );
    }

    #[test]
    fn telemetry_takes_engine_output_tail() {
        // 2 audio + 8 analog => digital at 10, 16 lines => telemetry at 26.
        let layout = plan(&hw(), 10, 30, true).unwrap();
        assert_eq!(layout.first_telemetry_channel, 26);
        assert_eq!(layout.telemetry_channels, 4);
        // Engine output stops inside the digital range => no telemetry.
        let layout = plan(&hw(), 10, 20, true).unwrap();
        assert_eq!(layout.telemetry_channels, 0);
    }

    #[test]
    fn digital_signal_split_follows_engine_counts() {
        let layout = plan(&hw(), 14, 30, true).unwrap();
        assert_eq!(layout.digital_signal_in_channels, 4);
        // 30 - 10 - telemetry(4) = 16 lines, exactly the hardware count.
        assert_eq!(layout.digital_signal_out_channels, 16);
    }

    #[test]
    fn engine_digital_range_clamps_to_hardware() {
        let hardware = HardwareConfig {
            digital_channels: 4,
            ..hw()
        };
        let layout = plan(&hardware, 20, 14, true).unwrap();
        assert_eq!(layout.digital_channels, 4);
        assert_eq!(layout.digital_signal_in_channels, 4);
        assert_eq!(layout.digital_signal_out_channels, 4);
    }

    #[test]
    fn disabled_digital_occupies_no_channels() {
        let layout = plan(&hw(), 14, 30, false).unwrap();
        assert_eq!(layout.digital_channels, 0);
        assert_eq!(layout.digital_signal_in_channels, 0);
        assert_eq!(layout.digital_signal_out_channels, 0);
        assert_eq!(layout.first_telemetry_channel, layout.first_digital_channel);
    }

    #[test]
    fn frame_ratio_must_be_integral() {
        let hardware = HardwareConfig {
            audio_frames: 16,
            analog_frames: 5,
            ..hw()
        };
        assert!(matches!(
            plan(&hardware, 2, 2, true),
            Err(LayoutError::AnalogRateMismatch { .. })
        ));
    }

    #[test]
    fn empty_block_is_fatal() {
        let hardware = HardwareConfig {
            audio_frames: 0,
            ..hw()
        };
        assert!(matches!(plan(&hardware, 2, 2, true), Err(LayoutError::EmptyBlock)));
    }
}
