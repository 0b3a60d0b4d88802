//! Interface to the external DSP processing engine.
//!
//! The engine is a collaborator with a fixed surface: it consumes one flat
//! input buffer per block, produces one flat output buffer, exposes named
//! receivers for typed messages and named tables for bulk data, and invokes
//! send/print hooks synchronously while a block is being processed.

/// Receiver names of the fixed messaging contract between the core and the
/// engine's patch logic.
pub mod receivers {
    /// Float: sets the output post-filter envelope rate in Hz.
    pub const TREMOLO_RATE: &str = "tremoloRate";
    /// Prefix for message-rate digital output requests; followed by a
    /// two-digit receiver number.
    pub const DIGITAL_OUT_PREFIX: &str = "bela_digitalOut";
    /// Prefix for message-rate digital input notifications sent to the
    /// engine; followed by the receiver number.
    pub const DIGITAL_IN_PREFIX: &str = "bela_digitalIn";
    /// Symbol + float (+ optional symbol): runtime digital line management.
    pub const SET_DIGITAL: &str = "bela_setDigital";
    /// Named table refilled once per full multiplexer cycle.
    pub const MULTIPLEXER_TABLE: &str = "bela_multiplexer";
    /// Float, sent once at startup: multiplexer channel count.
    pub const MULTIPLEXER_CHANNELS: &str = "bela_multiplexerChannels";
    /// Pair (line index, level): key matrix edge events.
    pub const KEY_STATUS: &str = "keystatus";
    /// Pair (line index, level): auxiliary sensor edge events.
    pub const AUX_KEY_STATUS: &str = "xkeystatus";
}

/// One element of a message payload arriving through the send hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Atom<'a> {
    Float(f32),
    Symbol(&'a str),
    Bang,
}

impl Atom<'_> {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Atom::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Atom::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

/// Callbacks the engine invokes synchronously during `process_block`.
pub trait EngineHook {
    /// A message sent by the patch to a named receiver.
    fn on_message(&mut self, receiver: &str, payload: &[Atom<'_>]);

    /// A print statement from the patch. Diagnostics only; never on the
    /// per-frame path.
    fn on_print(&mut self, timestamp_secs: f64, label: &str, text: &str) {
        log::info!("print: [@ {timestamp_secs:.3}] {label}: {text}");
    }
}

/// The DSP engine surface consumed by the session.
///
/// All sends are fire-and-forget: an engine with no matching receiver drops
/// the message, mirroring the silent-degradation policy of the block path.
pub trait ProcessingEngine {
    fn input_channels(&self) -> usize;
    fn output_channels(&self) -> usize;

    /// Process one block. `input` and `output` are channel-major flat buffers
    /// sized `channels × frames`. Hook callbacks fire before this returns.
    fn process_block(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        frames: usize,
        hook: &mut dyn EngineHook,
    );

    fn send_float(&mut self, receiver: &str, value: f32);

    /// Two-float event, used by the sensor edge reporters (line id, level).
    fn send_pair(&mut self, receiver: &str, a: f32, b: f32);

    fn send_bang(&mut self, receiver: &str);

    /// Mutable view of a named table, if the engine defines it.
    fn table_mut(&mut self, table: &str) -> Option<&mut [f32]>;

    /// Resize a named table. Setup-time only.
    fn set_table_length(&mut self, table: &str, length: usize);
}
