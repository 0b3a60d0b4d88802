//! gridsim - desktop simulator for the block loop
//!
//! Hosts a full session against fake hardware: a sine tone on the audio
//! inputs, idle sensors, and a control thread sweeping the tremolo rate
//! through the host queue. Audio output goes to the default sound card.
//!
//! Run with: cargo run --bin gridsim
//! Set RUST_LOG=debug to watch telemetry and engine traffic.

mod sim;

use std::sync::{Arc, Mutex};

use color_eyre::eyre::{eyre, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use belagrid::hardware::HardwareConfig;
use belagrid::message::ControlMessage;
use belagrid::{SessionConfig, SessionState};
use sim::{LogTelemetry, SimEngine, SimFrontend, SimLineManager};

/// Audio frames per simulated hardware block.
const BLOCK_FRAMES: usize = 16;

struct AudioState {
    session: SessionState<SimEngine>,
    frontend: SimFrontend,
    controls: rtrb::Consumer<ControlMessage>,
    /// Interleaved leftovers of the last rendered block.
    carry: Vec<f32>,
    carry_pos: usize,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    let hardware = HardwareConfig {
        sample_rate,
        audio_frames: BLOCK_FRAMES,
        analog_frames: BLOCK_FRAMES / 2,
        digital_frames: BLOCK_FRAMES,
        audio_in_channels: 2,
        audio_out_channels: 2,
        analog_in_channels: 8,
        analog_out_channels: 8,
        digital_channels: 16,
        multiplexer_channels: 0,
    };

    let session = SessionState::new(
        hardware,
        SessionConfig::default(),
        SimEngine::new(),
        Box::new(SimLineManager::default()),
        Box::new(LogTelemetry::new(sample_rate as usize)),
    )
    .wrap_err("session setup failed")?;

    println!("=== gridsim ===");
    println!("Sample rate: {sample_rate} Hz");
    println!("Output channels: {channels}");
    println!("Block: {BLOCK_FRAMES} audio frames");
    println!("Playing a tone through the tremolo post-filter... Ctrl+C to stop");

    let (mut control_tx, control_rx) = rtrb::RingBuffer::<ControlMessage>::new(64);

    // Sweep the tremolo rate so the post-filter is audible as motion.
    std::thread::spawn(move || {
        let mut t = 0.0f32;
        loop {
            let rate = 4.0 + 3.0 * (t * 0.2).sin();
            let _ = control_tx.push(ControlMessage::TremoloRate(rate));
            t += 1.0;
            std::thread::sleep(std::time::Duration::from_millis(250));
        }
    });

    let state = Arc::new(Mutex::new(AudioState {
        session,
        frontend: SimFrontend::new(hardware, 220.0),
        controls: control_rx,
        carry: Vec::new(),
        carry_pos: 0,
    }));

    let state_clone = state.clone();
    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            let mut state = state_clone.lock().unwrap();
            let AudioState {
                session,
                frontend,
                controls,
                carry,
                carry_pos,
            } = &mut *state;

            let mut written = 0;
            while written < data.len() {
                if *carry_pos >= carry.len() {
                    session.drain_controls(controls);
                    frontend.prepare_block();
                    session.render(frontend);

                    carry.clear();
                    let out = frontend.audio_out();
                    for frame in 0..out.frames() {
                        for ch in 0..channels {
                            let src = ch.min(out.channels() - 1);
                            carry.push(out.get(src, frame));
                        }
                    }
                    *carry_pos = 0;
                }
                let take = (carry.len() - *carry_pos).min(data.len() - written);
                data[written..written + take]
                    .copy_from_slice(&carry[*carry_pos..*carry_pos + take]);
                written += take;
                *carry_pos += take;
            }
        },
        |err| log::error!("audio stream error: {err}"),
        None,
    )?;

    stream.play()?;

    loop {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
}
