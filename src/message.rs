//! Control-message routing.
//!
//! Messages reach the core from two sides: the engine's send hook (patch
//! logic addressing the fixed receiver-name contract) and, optionally, a
//! host thread feeding a queue. Both funnel into the same tagged
//! `ControlMessage` variants, so dispatch is an exhaustive match on a finite
//! set of kinds rather than run-time string hashing — two distinct receivers
//! can never silently alias.
//!
//! Parsing is allocation-free and bounded: the digital-out channel suffix is
//! decoded by a two-digit parser that is explicit about malformed input.

use crate::digital::LineDirection;
use crate::engine::{receivers, Atom};

/// A decoded control message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    /// New tremolo envelope rate in Hz.
    TremoloRate(f32),
    /// Message-rate digital output request for a hardware line.
    DigitalOut { channel: usize, value: bool },
    /// (Re)configure a digital line at runtime.
    ManageDigital {
        channel: usize,
        direction: LineDirection,
        message_rate: bool,
    },
    /// Stop managing a digital line.
    UnmanageDigital { channel: usize },
}

/// Maps the fixed receiver-name set to `ControlMessage` variants. Built once
/// at setup from the session layout; routing itself is allocation-free.
#[derive(Debug, Clone, Copy)]
pub struct MessageRouter {
    digital_channel_offset: usize,
    digital_channels: usize,
}

impl MessageRouter {
    pub fn new(digital_channel_offset: usize, digital_channels: usize) -> Self {
        Self {
            digital_channel_offset,
            digital_channels,
        }
    }

    /// Decode a send-hook message. `None` means the message is not ours,
    /// malformed, or out of range — all dropped silently per the error
    /// policy, with no state change.
    pub fn route(&self, receiver: &str, payload: &[Atom<'_>]) -> Option<ControlMessage> {
        if receiver == receivers::TREMOLO_RATE {
            let rate = payload.first()?.as_float()?;
            return Some(ControlMessage::TremoloRate(rate));
        }
        if let Some(suffix) = receiver.strip_prefix(receivers::DIGITAL_OUT_PREFIX) {
            let number = parse_channel_suffix(suffix)?;
            let channel = self.hardware_channel(number as i64)?;
            let value = payload.first()?.as_float()? != 0.0;
            return Some(ControlMessage::DigitalOut { channel, value });
        }
        if receiver == receivers::SET_DIGITAL {
            return self.route_set_digital(payload);
        }
        None
    }

    /// `bela_setDigital`: symbol ("in" | "out" | "disable"), float channel,
    /// optional symbol ("~" or "sig…") selecting signal rate.
    fn route_set_digital(&self, payload: &[Atom<'_>]) -> Option<ControlMessage> {
        let symbol = payload.first()?.as_symbol()?;
        let number = payload.get(1)?.as_float()?;
        let channel = self.hardware_channel(number as i64)?;
        let direction = match symbol {
            "in" => LineDirection::Input,
            "out" => LineDirection::Output,
            "disable" => return Some(ControlMessage::UnmanageDigital { channel }),
            _ => return None,
        };
        let message_rate = match payload.get(2).and_then(Atom::as_symbol) {
            Some(s) => !(s == "~" || s.starts_with("sig")),
            None => true,
        };
        Some(ControlMessage::ManageDigital {
            channel,
            direction,
            message_rate,
        })
    }

    /// Receiver numbering → hardware line index, dropping anything outside
    /// the configured digital range.
    fn hardware_channel(&self, receiver_number: i64) -> Option<usize> {
        let channel = receiver_number.checked_sub(self.digital_channel_offset as i64)?;
        (0..self.digital_channels as i64)
            .contains(&channel)
            .then_some(channel as usize)
    }
}

/// Decode a receiver-name channel suffix: exactly two ASCII digits.
pub fn parse_channel_suffix(suffix: &str) -> Option<usize> {
    match suffix.as_bytes() {
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => {
            Some(((a - b'0') as usize) * 10 + (b - b'0') as usize)
        }
        _ => None,
    }
}

/// A queue of host-side control messages drained between blocks.
pub trait ControlSource {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl ControlSource for rtrb::Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        rtrb::Consumer::pop(self).ok()
    }
}
