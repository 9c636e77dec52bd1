//! Audio input device enumeration

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::AudioError;

/// Description of an input device for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<u16>,
}

/// Wrapper around cpal device
pub struct AudioDevice {
    inner: cpal::Device,
    pub name: String,
}

impl AudioDevice {
    pub fn from_cpal(device: cpal::Device) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Self {
            inner: device,
            name,
        }
    }

    pub fn into_inner(self) -> cpal::Device {
        self.inner
    }

    /// Get default input config
    pub fn default_input_config(&self) -> Result<cpal::SupportedStreamConfig, AudioError> {
        Ok(self.inner.default_input_config()?)
    }

    /// Whether the device accepts `sample_rate` with `channels` for input
    pub fn supports(&self, sample_rate: u32, channels: u16) -> bool {
        let rate = cpal::SampleRate(sample_rate);
        self.inner
            .supported_input_configs()
            .map(|mut configs| {
                configs.any(|c| {
                    c.channels() == channels
                        && rate >= c.min_sample_rate()
                        && rate <= c.max_sample_rate()
                })
            })
            .unwrap_or(false)
    }
}

/// List all available input devices
pub fn list_devices() -> Vec<AudioDeviceInfo> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let default_input_name = host
        .default_input_device()
        .and_then(|d| d.name().ok());

    if let Ok(input_devices) = host.input_devices() {
        for device in input_devices {
            if let Ok(name) = device.name() {
                let (sample_rates, channels) = get_device_capabilities(&device);
                devices.push(AudioDeviceInfo {
                    id: format!("input:{}", name),
                    is_default: default_input_name.as_ref() == Some(&name),
                    name,
                    sample_rates,
                    channels,
                });
            }
        }
    }

    devices
}

/// Get device capabilities
fn get_device_capabilities(device: &cpal::Device) -> (Vec<u32>, Vec<u16>) {
    let mut sample_rates = Vec::new();
    let mut channels = Vec::new();

    if let Ok(configs) = device.supported_input_configs() {
        for config in configs {
            // Telephony and common rates
            for rate_val in [8000u32, 16000, 44100, 48000] {
                let rate = cpal::SampleRate(rate_val);
                if rate >= config.min_sample_rate()
                    && rate <= config.max_sample_rate()
                    && !sample_rates.contains(&rate_val)
                {
                    sample_rates.push(rate_val);
                }
            }

            let ch = config.channels();
            if !channels.contains(&ch) {
                channels.push(ch);
            }
        }
    }

    sample_rates.sort();
    channels.sort();

    (sample_rates, channels)
}

/// Get an input device by its ID (`input:<name>` or a bare name)
pub fn get_device_by_id(id: &str) -> Result<AudioDevice, AudioError> {
    let host = cpal::default_host();
    let name = id.strip_prefix("input:").unwrap_or(id);

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

    for device in devices {
        if let Ok(device_name) = device.name() {
            if device_name == name {
                return Ok(AudioDevice::from_cpal(device));
            }
        }
    }

    Err(AudioError::DeviceNotFound(id.to_string()))
}

/// Get default input device
pub fn get_default_input_device() -> Result<AudioDevice, AudioError> {
    let host = cpal::default_host();
    host.default_input_device()
        .map(AudioDevice::from_cpal)
        .ok_or_else(|| AudioError::DeviceNotFound("No default input device".to_string()))
}

/// Resolve a configured device ID, falling back to the default input
pub fn resolve_input_device(id: Option<&str>) -> Result<AudioDevice, AudioError> {
    match id {
        Some(id) => get_device_by_id(id),
        None => get_default_input_device(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_device_id() {
        // No host has a device with this name; hosts without audio fail too
        let result = get_device_by_id("input:__no_such_device__");
        assert!(matches!(result, Err(AudioError::DeviceNotFound(_))));
    }

    #[test]
    fn test_listed_ids_are_prefixed() {
        for device in list_devices() {
            assert!(device.id.starts_with("input:"));
            assert_eq!(device.id, format!("input:{}", device.name));
        }
    }
}
