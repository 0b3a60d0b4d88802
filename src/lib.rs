pub mod buffer;
pub mod debounce; // Sensor hysteresis and edge events
pub mod digital; // Digital line dispatch and address lines
pub mod engine; // External DSP engine interface
pub mod hardware;
pub mod layout; // Setup-time channel layout planning
pub mod message; // Control-message parsing and routing
pub mod mux;
pub mod router; // Per-block de-interleave/interleave
pub mod session; // Owned session state and block entry point
pub mod telemetry;
pub mod tremolo;

pub use session::{SessionConfig, SessionState, SetupError};
