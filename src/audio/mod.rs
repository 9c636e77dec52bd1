//! Audio subsystem module

pub mod buffer;
pub mod capture;
pub mod device;
pub mod source;

pub use buffer::FrameAssembler;
pub use capture::AudioCapture;
pub use device::{list_devices, get_device_by_id, AudioDevice, AudioDeviceInfo};
pub use source::{PacketSource, SyntheticSource};
