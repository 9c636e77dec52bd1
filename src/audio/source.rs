//! Frame sources for the sender

use bytes::Bytes;
use std::future::Future;

use crate::audio::buffer::FrameAssembler;
use crate::error::AudioError;

/// Something that yields fixed-size PCM frames
pub trait PacketSource {
    /// Wait until one full frame is available
    fn next_frame(&mut self) -> impl Future<Output = Result<Bytes, AudioError>> + Send;

    /// Bytes in every frame this source yields
    fn frame_bytes(&self) -> usize;
}

/// Device-less source producing a sine tone (or silence at zero frequency)
pub struct SyntheticSource {
    assembler: FrameAssembler,
    frame_samples: usize,
    channels: u16,
    sample_rate: u32,
    frequency: f32,
    phase: f32,
}

impl SyntheticSource {
    pub fn new(frame_samples: usize, channels: u16, sample_rate: u32, frequency: f32) -> Self {
        Self {
            assembler: FrameAssembler::new(frame_samples, channels),
            frame_samples,
            channels,
            sample_rate,
            frequency,
            phase: 0.0,
        }
    }

    pub fn silence(frame_samples: usize, channels: u16, sample_rate: u32) -> Self {
        Self::new(frame_samples, channels, sample_rate, 0.0)
    }

    fn generate(&mut self) -> Vec<f32> {
        let step = std::f32::consts::TAU * self.frequency / self.sample_rate as f32;
        let mut samples = Vec::with_capacity(self.assembler.frame_len());
        for _ in 0..self.frame_samples {
            let value = 0.5 * self.phase.sin();
            self.phase = (self.phase + step) % std::f32::consts::TAU;
            samples.extend(std::iter::repeat(value).take(self.channels as usize));
        }
        samples
    }
}

impl PacketSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<Bytes, AudioError> {
        loop {
            if let Some(frame) = self.assembler.pop_frame() {
                return Ok(frame);
            }
            let samples = self.generate();
            self.assembler.push(&samples);
        }
    }

    fn frame_bytes(&self) -> usize {
        self.assembler.frame_len() * 2
    }
}
