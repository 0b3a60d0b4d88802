//! Hardware-facing interfaces: per-session I/O dimensions and the raw
//! read/write primitives the block loop drives.
//!
//! The actual hardware access (DMA buffers, SPI ADC, GPIO banks) lives outside
//! this crate. The core only sees `HardwareConfig` — read once at setup — and
//! a `HardwareIo` implementation valid for the duration of one block.

/// Fixed I/O dimensions for one session, captured before block processing
/// starts and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HardwareConfig {
    pub sample_rate: f32,
    /// Audio frames per block.
    pub audio_frames: usize,
    /// Analog frames per block. A sub-multiple of `audio_frames` (or zero).
    pub analog_frames: usize,
    /// Digital frames per block.
    pub digital_frames: usize,
    pub audio_in_channels: usize,
    pub audio_out_channels: usize,
    pub analog_in_channels: usize,
    pub analog_out_channels: usize,
    pub digital_channels: usize,
    /// Channels on the external addressable multiplexer (zero when absent).
    pub multiplexer_channels: usize,
}

impl HardwareConfig {
    /// True when the hardware exposes a usable digital bank.
    pub fn digital_present(&self) -> bool {
        self.digital_frames > 0 && self.digital_channels > 0
    }
}

/// Raw sample access for one block. All indices are (frame, channel) within
/// the current block; implementations are expected to bounds-check in debug
/// builds at most — callers stay within the counts from `HardwareConfig`.
pub trait HardwareIo {
    fn audio_read(&self, frame: usize, channel: usize) -> f32;
    fn audio_write(&mut self, frame: usize, channel: usize, value: f32);

    fn analog_read(&self, frame: usize, channel: usize) -> f32;
    /// Write one analog output sample without latching it for later frames.
    fn analog_write_once(&mut self, frame: usize, channel: usize, value: f32);

    fn digital_read(&self, frame: usize, channel: usize) -> bool;
    /// Write a digital output level that persists for the rest of the block.
    fn digital_write(&mut self, frame: usize, channel: usize, value: bool);
    /// Write a digital output level for this frame only.
    fn digital_write_once(&mut self, frame: usize, channel: usize, value: bool);

    /// The most recent full multiplexer sample set, one sample per
    /// (multiplexer channel × analog input channel), or an empty slice while
    /// the first cycle is still filling.
    fn multiplexer_analog_in(&self) -> &[f32];
}
