//! Simulated hardware frontend, engine, and collaborators for gridsim.

use std::collections::HashMap;
use std::f32::consts::TAU;

use belagrid::buffer::FlatBuffer;
use belagrid::digital::{DigitalLineManager, LineDirection};
use belagrid::engine::{EngineHook, ProcessingEngine};
use belagrid::hardware::{HardwareConfig, HardwareIo};
use belagrid::session::AUX_PIN;
use belagrid::telemetry::TelemetrySink;

/// Fake hardware frontend: a sine tone on the audio inputs, sensors idle,
/// audio output captured for the sound card.
pub struct SimFrontend {
    config: HardwareConfig,
    audio_in: FlatBuffer,
    audio_out: FlatBuffer,
    analog_out: FlatBuffer,
    phase: f32,
    tone_hz: f32,
}

impl SimFrontend {
    pub fn new(config: HardwareConfig, tone_hz: f32) -> Self {
        Self {
            audio_in: FlatBuffer::new(config.audio_in_channels, config.audio_frames),
            audio_out: FlatBuffer::new(config.audio_out_channels, config.audio_frames),
            analog_out: FlatBuffer::new(
                config.analog_out_channels.max(1),
                config.analog_frames.max(1),
            ),
            phase: 0.0,
            tone_hz,
            config,
        }
    }

    /// Generate the input side of the next block.
    pub fn prepare_block(&mut self) {
        let step = TAU * self.tone_hz / self.config.sample_rate;
        for frame in 0..self.config.audio_frames {
            let sample = self.phase.sin() * 0.5;
            self.phase = (self.phase + step) % TAU;
            for ch in 0..self.config.audio_in_channels {
                self.audio_in.set(ch, frame, sample);
            }
        }
    }

    pub fn audio_out(&self) -> &FlatBuffer {
        &self.audio_out
    }
}

impl HardwareIo for SimFrontend {
    fn audio_read(&self, frame: usize, channel: usize) -> f32 {
        self.audio_in.get(channel, frame)
    }
    fn audio_write(&mut self, frame: usize, channel: usize, value: f32) {
        self.audio_out.set(channel, frame, value);
    }
    fn analog_read(&self, _frame: usize, _channel: usize) -> f32 {
        // Mid-band: keeps the hit detector quiet.
        0.25
    }
    fn analog_write_once(&mut self, frame: usize, channel: usize, value: f32) {
        self.analog_out.set(channel, frame, value);
    }
    fn digital_read(&self, frame: usize, channel: usize) -> bool {
        // Idle levels: everything pulled up, except the active-high aux
        // sensor on its first scan frame.
        !(frame == 0 && channel == AUX_PIN)
    }
    fn digital_write(&mut self, _frame: usize, _channel: usize, _value: bool) {}
    fn digital_write_once(&mut self, _frame: usize, _channel: usize, _value: bool) {}
    fn multiplexer_analog_in(&self) -> &[f32] {
        &[]
    }
}

/// Passthrough engine: audio and analog inputs are copied straight to the
/// matching outputs, the audio pair is mirrored onto the telemetry range, and
/// every incoming event is logged.
pub struct SimEngine {
    tables: HashMap<String, Vec<f32>>,
}

impl SimEngine {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingEngine for SimEngine {
    fn input_channels(&self) -> usize {
        10
    }

    fn output_channels(&self) -> usize {
        28
    }

    fn process_block(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        frames: usize,
        _hook: &mut dyn EngineHook,
    ) {
        output.fill(0.0);
        for ch in 0..self.input_channels() {
            let span = ch * frames..(ch + 1) * frames;
            output[span.clone()].copy_from_slice(&input[span]);
        }
        for ch in 0..2 {
            let src = ch * frames..(ch + 1) * frames;
            let dst = (26 + ch) * frames..(27 + ch) * frames;
            let (lo, hi) = output.split_at_mut(dst.start);
            hi[..frames].copy_from_slice(&lo[src]);
        }
    }

    fn send_float(&mut self, receiver: &str, value: f32) {
        log::debug!("engine <- {receiver} {value}");
    }

    fn send_pair(&mut self, receiver: &str, a: f32, b: f32) {
        log::info!("engine <- {receiver} {a} {b}");
    }

    fn send_bang(&mut self, receiver: &str) {
        log::info!("engine <- {receiver} bang");
    }

    fn table_mut(&mut self, table: &str) -> Option<&mut [f32]> {
        self.tables.get_mut(table).map(|t| t.as_mut_slice())
    }

    fn set_table_length(&mut self, table: &str, length: usize) {
        self.tables.insert(table.to_string(), vec![0.0; length]);
    }
}

/// In-memory line manager that logs reconfiguration requests.
#[derive(Default)]
pub struct SimLineManager {
    modes: HashMap<usize, (LineDirection, bool)>,
    latched: HashMap<usize, bool>,
}

impl DigitalLineManager for SimLineManager {
    fn manage(&mut self, channel: usize, direction: LineDirection, message_rate: bool) {
        log::info!("digital line {channel} -> {direction:?}, message_rate={message_rate}");
        self.modes.insert(channel, (direction, message_rate));
    }

    fn unmanage(&mut self, channel: usize) {
        log::info!("digital line {channel} disabled");
        self.modes.remove(&channel);
        self.latched.remove(&channel);
    }

    fn is_output(&self, channel: usize) -> bool {
        matches!(self.modes.get(&channel), Some((LineDirection::Output, _)))
    }

    fn is_signal_rate(&self, channel: usize) -> bool {
        matches!(self.modes.get(&channel), Some((_, false)))
    }

    fn set_value(&mut self, channel: usize, value: bool) {
        self.latched.insert(channel, value);
    }

    fn process_input(
        &mut self,
        _hardware: &dyn HardwareIo,
        _frames: usize,
        _events: &mut dyn FnMut(usize, bool),
    ) {
    }

    fn process_output(&mut self, hardware: &mut dyn HardwareIo, _frames: usize) {
        for (&channel, &value) in &self.latched {
            hardware.digital_write(0, channel, value);
        }
    }
}

/// Telemetry sink that logs the peak of every channel once a second or so.
pub struct LogTelemetry {
    interval: usize,
    rows_seen: usize,
    peaks: Vec<f32>,
}

impl LogTelemetry {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            rows_seen: 0,
            peaks: Vec::new(),
        }
    }
}

impl TelemetrySink for LogTelemetry {
    fn log_sample(&mut self, values: &[f32]) {
        if self.peaks.len() != values.len() {
            self.peaks = vec![0.0; values.len()];
        }
        for (peak, &value) in self.peaks.iter_mut().zip(values) {
            *peak = peak.max(value.abs());
        }
        self.rows_seen += 1;
        if self.rows_seen >= self.interval {
            log::debug!("telemetry peaks: {:?}", self.peaks);
            self.rows_seen = 0;
            self.peaks.fill(0.0);
        }
    }
}
