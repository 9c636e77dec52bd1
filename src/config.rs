//! Application configuration
//!
//! Loaded from TOML. Every section has defaults so a partial file (or no
//! file at all) is valid.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::protocol::{SequenceMode, WrapPolicy};

/// Top-level configuration shared by both binaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub capture: CaptureConfig,
    pub stream: StreamConfig,
    pub metrics: MetricsConfig,
}

/// UDP endpoints and socket tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the receiver binds to
    pub bind_address: SocketAddr,
    /// Address the sender transmits to
    pub target_address: SocketAddr,
    /// Receive buffer length handed to `recv_from`
    pub max_datagram_size: usize,
    /// Kernel socket buffer sizes (bytes); `None` keeps the OS default
    pub recv_buffer_size: Option<usize>,
    pub send_buffer_size: Option<usize>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], DEFAULT_UDP_PORT)),
            target_address: SocketAddr::from(([127, 0, 0, 1], DEFAULT_UDP_PORT)),
            max_datagram_size: MAX_DATAGRAM_SIZE,
            recv_buffer_size: None,
            send_buffer_size: None,
        }
    }
}

/// Capture device and pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device ID as reported by `list_devices`; default input when unset
    pub device_id: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel in one packet
    pub frame_samples: usize,
    /// Pause after each send
    pub send_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            frame_samples: DEFAULT_FRAME_SAMPLES,
            send_interval_ms: DEFAULT_SEND_INTERVAL_MS,
        }
    }
}

impl CaptureConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    /// Bytes of 16-bit PCM in one frame
    pub fn frame_bytes(&self) -> usize {
        self.frame_samples * self.channels as usize * 2
    }

    /// Audio duration covered by one frame, in milliseconds
    pub fn frame_duration_ms(&self) -> f32 {
        self.frame_samples as f32 * 1000.0 / self.sample_rate as f32
    }
}

/// Sequencing behavior on both ends
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub sequence_mode: SequenceMode,
    pub wrap_policy: WrapPolicy,
}

/// Metrics log output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub log_path: PathBuf,
    /// Print a status line per packet
    pub print_status: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            print_status: true,
        }
    }
}

impl AppConfig {
    /// Load from an explicit path, else the per-user config file if present,
    /// else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => {
                    tracing::info!("Loading config from {}", path.display());
                    Self::from_file(&path)?
                }
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// `<config dir>/audio-link-monitor/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "audio-link-monitor")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be non-zero".into()));
        }
        if self.capture.channels == 0 {
            return Err(Error::Config("channels must be non-zero".into()));
        }
        if self.capture.frame_samples == 0 {
            return Err(Error::Config("frame_samples must be non-zero".into()));
        }
        if self.network.max_datagram_size < SEQUENCE_HEADER_LEN {
            return Err(Error::Config(format!(
                "max_datagram_size must be at least {}",
                SEQUENCE_HEADER_LEN
            )));
        }
        let needed = self.capture.frame_bytes()
            + match self.stream.sequence_mode {
                SequenceMode::Prefixed => SEQUENCE_HEADER_LEN,
                SequenceMode::Raw => 0,
            };
        if needed > self.network.max_datagram_size {
            return Err(Error::Config(format!(
                "a {} byte packet exceeds max_datagram_size {}",
                needed, self.network.max_datagram_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_cadence() {
        let config = AppConfig::default();
        assert_eq!(config.capture.frame_samples, 160);
        assert_eq!(config.capture.sample_rate, 8000);
        assert_eq!(config.capture.send_interval(), Duration::from_millis(20));
        assert!((config.capture.frame_duration_ms() - 20.0).abs() < f32::EPSILON);
        assert_eq!(config.network.bind_address.port(), 5004);
        assert_eq!(config.stream.wrap_policy, WrapPolicy::Signed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [stream]
            sequence_mode = "raw"
            wrap_policy = "rollover"

            [metrics]
            log_path = "/tmp/run.log"
            "#,
        )
        .unwrap();
        assert_eq!(config.stream.sequence_mode, SequenceMode::Raw);
        assert_eq!(config.stream.wrap_policy, WrapPolicy::Rollover);
        assert_eq!(config.metrics.log_path, PathBuf::from("/tmp/run.log"));
        assert!(config.metrics.print_status);
        assert_eq!(config.capture, CaptureConfig::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AppConfig::default();
        config.capture.device_id = Some("input:USB Mic".into());
        let text = config.to_toml().unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_oversized_frame() {
        let mut config = AppConfig::default();
        config.capture.frame_samples = 1024;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_frame() {
        let mut config = AppConfig::default();
        config.capture.frame_samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[capture]\nsend_interval_ms = 10\n").unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.capture.send_interval_ms, 10);
    }
}
