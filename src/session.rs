//! Session state and the per-block entry point.
//!
//! `SessionState` is the one explicitly owned structure holding everything
//! mutable across blocks: the channel layout, the engine-facing buffers,
//! debounce state, the multiplexer cycle, the tremolo envelope, and the boxed
//! external collaborators. Construction is the setup phase and the only place
//! that allocates; `render` runs once per hardware block, to completion,
//! without blocking, locking, or allocating.

use crate::buffer::FlatBuffer;
use crate::debounce::{HitDetector, HitDetectorConfig, SensorGrid};
use crate::digital::{self, DigitalLineManager, ADDRESS_LINES};
use crate::engine::{receivers, Atom, EngineHook, ProcessingEngine};
use crate::hardware::{HardwareConfig, HardwareIo};
use crate::layout::{self, ChannelLayout, LayoutError};
use crate::message::{ControlMessage, ControlSource, MessageRouter};
use crate::mux::MultiplexerCycle;
use crate::router::BlockRouter;
use crate::telemetry::{TelemetrySink, TelemetryTap};
use crate::tremolo::TremoloEnvelope;

/// Key matrix rows, wired to consecutive digital pins.
pub const MATRIX_ROWS: usize = 6;
/// Key matrix columns, selected by the address lines one per scan frame.
pub const MATRIX_COLS: usize = 8;
/// Auxiliary sensor lines, one per scan frame on a shared pin.
pub const AUX_LINES: usize = 8;
/// First digital pin of the matrix row bank (rows occupy pins 3..9).
pub const MATRIX_FIRST_PIN: usize = 3;
/// Digital pin shared by the auxiliary sensors.
pub const AUX_PIN: usize = 15;

/// Session-level tuning. Defaults reproduce the instrument's wiring: the
/// bottom-right corner of the matrix has no keys, aux line 0 is wired
/// active-high, and the hit sensor sits on analog channel 0.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    pub tremolo_rate_hz: f32,
    /// Falling-edge hold for matrix keys, in scan passes.
    pub matrix_hold_frames: u32,
    /// Falling-edge hold for auxiliary sensors, in scan passes.
    pub aux_hold_frames: u32,
    pub matrix_enabled: [[bool; MATRIX_COLS]; MATRIX_ROWS],
    pub aux_enabled: [bool; AUX_LINES],
    pub aux_active_low: [bool; AUX_LINES],
    pub hit: HitDetectorConfig,
    /// Analog input channel carrying the hit sensor.
    pub hit_sensor_channel: usize,
    /// Receiver that gets a bang per detected hit.
    pub hit_receiver: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut matrix_enabled = [[true; MATRIX_COLS]; MATRIX_ROWS];
        for column in 4..MATRIX_COLS {
            matrix_enabled[MATRIX_ROWS - 1][column] = false;
        }
        let mut aux_active_low = [true; AUX_LINES];
        aux_active_low[0] = false;
        Self {
            tremolo_rate_hz: 4.0,
            matrix_hold_frames: 256,
            aux_hold_frames: 0,
            matrix_enabled,
            aux_enabled: [true; AUX_LINES],
            aux_active_low,
            hit: HitDetectorConfig::default(),
            hit_sensor_channel: 0,
            hit_receiver: "nedslag1".to_string(),
        }
    }
}

/// Setup-phase failures. Block processing must never start after one of
/// these.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("hit sensor channel {channel} exceeds analog input channels {available}")]
    HitChannelOutOfRange { channel: usize, available: usize },
}

/// All per-session state, constructed once and driven by the real-time
/// scheduler through `render`.
pub struct SessionState<E: ProcessingEngine> {
    hardware: HardwareConfig,
    config: SessionConfig,
    layout: ChannelLayout,
    router: BlockRouter,
    mux: Option<MultiplexerCycle>,
    matrix: SensorGrid<MATRIX_ROWS, MATRIX_COLS>,
    aux: SensorGrid<1, AUX_LINES>,
    hit: HitDetector,
    tremolo: TremoloEnvelope,
    telemetry_tap: TelemetryTap,
    telemetry_sink: Box<dyn TelemetrySink>,
    manager: Box<dyn DigitalLineManager>,
    msg_router: MessageRouter,
    digital_in_names: Vec<String>,
    digital_enabled: bool,
    engine: E,
}

impl<E: ProcessingEngine> SessionState<E> {
    /// Set up a session: plan the layout, allocate every buffer the block
    /// path will ever touch, and announce the multiplexer table to the
    /// engine. Fails fatally on misconfiguration.
    pub fn new(
        hardware: HardwareConfig,
        config: SessionConfig,
        mut engine: E,
        manager: Box<dyn DigitalLineManager>,
        telemetry_sink: Box<dyn TelemetrySink>,
    ) -> Result<Self, SetupError> {
        let digital_enabled = hardware.digital_present();
        let engine_in = engine.input_channels();
        let engine_out = engine.output_channels();
        let layout = layout::plan(&hardware, engine_in, engine_out, digital_enabled)?;

        if hardware.analog_in_channels > 0
            && config.hit_sensor_channel >= hardware.analog_in_channels
        {
            return Err(SetupError::HitChannelOutOfRange {
                channel: config.hit_sensor_channel,
                available: hardware.analog_in_channels,
            });
        }

        log::info!(
            "session layout: engine {engine_in} in / {engine_out} out, \
             digital signal {} in / {} out, telemetry {}",
            layout.digital_signal_in_channels,
            layout.digital_signal_out_channels,
            layout.telemetry_channels,
        );

        let mut matrix = SensorGrid::new(config.matrix_hold_frames);
        for (row, columns) in config.matrix_enabled.iter().enumerate() {
            for (column, &enabled) in columns.iter().enumerate() {
                matrix.set_enabled(row, column, enabled);
            }
        }
        let mut aux = SensorGrid::new(config.aux_hold_frames);
        for line in 0..AUX_LINES {
            aux.set_enabled(0, line, config.aux_enabled[line]);
            aux.set_active_low(0, line, config.aux_active_low[line]);
        }

        let mux = MultiplexerCycle::new(hardware.multiplexer_channels, hardware.analog_in_channels);
        if let Some(cycle) = &mux {
            engine.set_table_length(receivers::MULTIPLEXER_TABLE, cycle.cycle_length());
            engine.send_float(
                receivers::MULTIPLEXER_CHANNELS,
                hardware.multiplexer_channels as f32,
            );
        }

        let digital_in_names = (0..layout.digital_channels)
            .map(|line| {
                format!(
                    "{}{}",
                    receivers::DIGITAL_IN_PREFIX,
                    line + layout.digital_channel_offset
                )
            })
            .collect();

        Ok(Self {
            router: BlockRouter::new(layout, hardware.audio_frames),
            mux,
            matrix,
            aux,
            hit: HitDetector::new(config.hit),
            tremolo: TremoloEnvelope::new(hardware.sample_rate, config.tremolo_rate_hz),
            telemetry_tap: TelemetryTap::new(&layout),
            telemetry_sink,
            manager,
            msg_router: MessageRouter::new(layout.digital_channel_offset, layout.digital_channels),
            digital_in_names,
            digital_enabled,
            engine,
            layout,
            hardware,
            config,
        })
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The engine-facing output buffer of the last rendered block.
    pub fn output(&self) -> &FlatBuffer {
        self.router.output()
    }

    pub fn tremolo_rate(&self) -> f32 {
        self.tremolo.rate()
    }

    /// Process one hardware block. Runs to completion; never blocks or
    /// allocates.
    pub fn render(&mut self, io: &mut dyn HardwareIo) {
        self.router.read_inputs(io, &self.hardware);
        self.refill_multiplexer(io);
        self.scan_message_rate_inputs(io);
        self.process_engine();
        self.write_digital_outputs(io);
        self.log_telemetry();
        self.scan_sensors(io);
        self.sample_hit_sensor(io);
        self.router
            .write_outputs(io, &self.hardware, &mut self.tremolo);
        if self.digital_enabled && self.hardware.digital_channels >= ADDRESS_LINES {
            digital::write_address_lines(io, self.hardware.digital_frames);
        }
    }

    /// Apply one host-side control message between blocks.
    pub fn handle_control(&mut self, message: ControlMessage) {
        apply_control(
            message,
            &mut self.tremolo,
            self.manager.as_mut(),
            self.digital_enabled,
        );
    }

    /// Drain a host control queue. Call between blocks, before `render`.
    pub fn drain_controls(&mut self, source: &mut dyn ControlSource) {
        while let Some(message) = source.pop() {
            self.handle_control(message);
        }
    }

    fn refill_multiplexer(&mut self, io: &dyn HardwareIo) {
        let Some(cycle) = self.mux.as_mut() else {
            return;
        };
        for _ in 0..self.hardware.analog_frames {
            cycle.tick();
            if cycle.is_complete() {
                if let Some(table) = self.engine.table_mut(receivers::MULTIPLEXER_TABLE) {
                    cycle.refill(io.multiplexer_analog_in(), table);
                }
            }
        }
    }

    fn scan_message_rate_inputs(&mut self, io: &dyn HardwareIo) {
        if !self.digital_enabled {
            return;
        }
        let Self {
            manager,
            engine,
            digital_in_names,
            hardware,
            ..
        } = self;
        manager.process_input(io, hardware.digital_frames, &mut |channel, level| {
            if let Some(name) = digital_in_names.get(channel) {
                engine.send_float(name, if level { 1.0 } else { 0.0 });
            }
        });
    }

    fn process_engine(&mut self) {
        let Self {
            engine,
            router,
            tremolo,
            manager,
            msg_router,
            digital_enabled,
            hardware,
            ..
        } = self;
        let (input, output) = router.engine_buffers();
        let mut hook = ControlHandler {
            msg_router: *msg_router,
            tremolo,
            manager: manager.as_mut(),
            digital_enabled: *digital_enabled,
        };
        engine.process_block(input, output, hardware.audio_frames, &mut hook);
    }

    fn write_digital_outputs(&mut self, io: &mut dyn HardwareIo) {
        if !self.digital_enabled {
            return;
        }
        if self.layout.digital_signal_out_channels > 0 {
            digital::write_signal_rate_outputs(
                self.manager.as_ref(),
                io,
                self.router.output(),
                &self.layout,
                self.hardware.digital_frames,
            );
        }
        self.manager.process_output(io, self.hardware.digital_frames);
    }

    fn log_telemetry(&mut self) {
        let Self {
            telemetry_tap,
            telemetry_sink,
            router,
            ..
        } = self;
        telemetry_tap.log_block(router.output(), telemetry_sink.as_mut());
    }

    /// Scan the key matrix and auxiliary sensors once per block. The scan
    /// reads one matrix column per digital frame, in step with the address
    /// lines written at the end of the previous block.
    fn scan_sensors(&mut self, io: &dyn HardwareIo) {
        let channels = self.hardware.digital_channels;
        let matrix_wired = channels >= MATRIX_FIRST_PIN + MATRIX_ROWS;
        let aux_wired = channels > AUX_PIN;
        let columns = MATRIX_COLS.min(self.hardware.digital_frames);

        for column in 0..columns {
            if matrix_wired {
                for row in 0..MATRIX_ROWS {
                    let level = io.digital_read(column, MATRIX_FIRST_PIN + row);
                    if let Some(edge) = self.matrix.sample(row, column, level) {
                        self.engine.send_pair(
                            receivers::KEY_STATUS,
                            (row * MATRIX_COLS + column) as f32,
                            edge.level(),
                        );
                    }
                }
            }
            if aux_wired {
                let level = io.digital_read(column, AUX_PIN);
                if let Some(edge) = self.aux.sample(0, column, level) {
                    self.engine
                        .send_pair(receivers::AUX_KEY_STATUS, column as f32, edge.level());
                }
            }
        }
    }

    fn sample_hit_sensor(&mut self, io: &dyn HardwareIo) {
        if self.hardware.analog_in_channels == 0 {
            return;
        }
        for frame in 0..self.hardware.analog_frames {
            let value = io.analog_read(frame, self.config.hit_sensor_channel);
            if self.hit.sample(value) {
                self.engine.send_bang(&self.config.hit_receiver);
            }
        }
    }
}

/// Send-hook adapter handed to the engine for the duration of one
/// `process_block` call.
struct ControlHandler<'a> {
    msg_router: MessageRouter,
    tremolo: &'a mut TremoloEnvelope,
    manager: &'a mut dyn DigitalLineManager,
    digital_enabled: bool,
}

impl EngineHook for ControlHandler<'_> {
    fn on_message(&mut self, receiver: &str, payload: &[Atom<'_>]) {
        if let Some(message) = self.msg_router.route(receiver, payload) {
            apply_control(message, self.tremolo, self.manager, self.digital_enabled);
        }
    }
}

fn apply_control(
    message: ControlMessage,
    tremolo: &mut TremoloEnvelope,
    manager: &mut dyn DigitalLineManager,
    digital_enabled: bool,
) {
    match message {
        ControlMessage::TremoloRate(rate) => tremolo.set_rate(rate),
        ControlMessage::DigitalOut { channel, value } if digital_enabled => {
            manager.set_value(channel, value);
        }
        ControlMessage::ManageDigital {
            channel,
            direction,
            message_rate,
        } if digital_enabled => {
            manager.manage(channel, direction, message_rate);
        }
        ControlMessage::UnmanageDigital { channel } if digital_enabled => {
            manager.unmanage(channel);
        }
        _ => {}
    }
}
