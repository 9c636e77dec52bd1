//! # Audio Link Monitor
//!
//! Streams fixed-size audio packets over UDP and measures the link's
//! real-time quality: sequence-gap packet loss and interarrival jitter.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   SENDER                     │
//! │  ┌──────────────┐      ┌──────────────────┐  │
//! │  │ AudioCapture │ ───▶ │   PacketSender   │  │
//! │  │ (cpal thread)│      │ [Seq|PCM] / 20ms │  │
//! │  └──────────────┘      └────────┬─────────┘  │
//! └─────────────────────────────────┼────────────┘
//!                                   │ UDP
//!                                   ▼
//! ┌──────────────────────────────────────────────┐
//! │                  RECEIVER                    │
//! │  ┌─────────────────────────────────────────┐ │
//! │  │ ReceiverContext (socket, state, log)    │ │
//! │  └──────┬──────────────────┬───────────────┘ │
//! │         ▼                  ▼                 │
//! │  ┌──────────────┐   ┌───────────────┐        │
//! │  │ SequenceTrkr │   │ JitterEstim.  │        │
//! │  └──────┬───────┘   └──────┬────────┘        │
//! │         └────────┬─────────┘                 │
//! │                  ▼                           │
//! │           ┌─────────────┐                    │
//! │           │ MetricsLog  │ Time,Jitter,Loss   │
//! │           └─────────────┘                    │
//! └──────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod metrics;
pub mod network;
pub mod protocol;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default capture sample rate
    pub const DEFAULT_SAMPLE_RATE: u32 = 8000;

    /// Default channel count (mono)
    pub const DEFAULT_CHANNELS: u16 = 1;

    /// Samples per channel in one packet (20 ms at 8 kHz)
    pub const DEFAULT_FRAME_SAMPLES: usize = 160;

    /// Pause between two sends in milliseconds
    pub const DEFAULT_SEND_INTERVAL_MS: u64 = 20;

    /// Default UDP port for audio streaming
    pub const DEFAULT_UDP_PORT: u16 = 5004;

    /// Largest datagram the receiver accepts
    pub const MAX_DATAGRAM_SIZE: usize = 2048;

    /// Length of the big-endian sequence prefix
    pub const SEQUENCE_HEADER_LEN: usize = 2;

    /// Default metrics log location
    pub const DEFAULT_LOG_PATH: &str = "metrics.log";

    /// Header line of the metrics log
    pub const LOG_HEADER: &str = "Time,Jitter,PacketLoss";

    /// Divisor applied to each interarrival delta
    pub const JITTER_GAIN_DIVISOR: f64 = 16.0;
}
