//! Sample accumulation into fixed-size PCM frames
//!
//! Capture callbacks deliver whatever chunk size the driver picks. The
//! assembler collects those chunks and cuts them into frames of exactly
//! `frame_samples * channels` samples, encoded as 16-bit little-endian PCM.

use bytes::{BufMut, Bytes, BytesMut};

/// Cuts a sample stream into fixed-size PCM frames
pub struct FrameAssembler {
    pending: Vec<f32>,
    frame_len: usize,
}

impl FrameAssembler {
    /// `frame_samples` per channel; `channels` interleaved
    pub fn new(frame_samples: usize, channels: u16) -> Self {
        let frame_len = frame_samples * channels as usize;
        Self {
            pending: Vec::with_capacity(frame_len * 2),
            frame_len,
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);
    }

    /// Take one complete frame if enough samples are pending
    pub fn pop_frame(&mut self) -> Option<Bytes> {
        if self.pending.len() < self.frame_len {
            return None;
        }
        let mut out = BytesMut::with_capacity(self.frame_len * 2);
        for sample in self.pending.drain(..self.frame_len) {
            out.put_i16_le(to_i16(sample));
        }
        Some(out.freeze())
    }

    /// Samples waiting for the next frame
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Total interleaved samples per frame
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
