//! Audio capture from an input device
//!
//! The cpal stream lives on its own thread (streams are not `Send` on every
//! host). Callback chunks are forwarded over an unbounded channel and cut
//! into fixed-size frames on the consumer side. There is no overflow
//! protection: if the consumer lags, chunks queue up.

use bytes::Bytes;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::audio::buffer::FrameAssembler;
use crate::audio::device::{resolve_input_device, AudioDevice};
use crate::audio::source::PacketSource;
use crate::config::CaptureConfig;
use crate::error::AudioError;

/// Interleaved samples from one callback, or the stream error that ended it
pub type CaptureEvent = Result<Vec<f32>, AudioError>;

/// Audio capture instance for a single input device
pub struct AudioCapture {
    /// Device name, for logging
    device_name: String,

    /// Device handle until the capture thread takes it
    device: Option<AudioDevice>,

    /// Whether capture is running
    running: Arc<AtomicBool>,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Chunks and stream errors from the callback thread
    events_rx: Option<UnboundedReceiver<CaptureEvent>>,

    /// Total samples captured
    samples_captured: Arc<AtomicU64>,

    /// Stream configuration
    config: StreamConfig,

    assembler: FrameAssembler,
}

impl AudioCapture {
    /// Open the configured device (or the default input)
    pub fn new(capture: &CaptureConfig) -> Result<Self, AudioError> {
        let device = resolve_input_device(capture.device_id.as_deref())?;

        if !device.supports(capture.sample_rate, capture.channels) {
            let default_config = device.default_input_config()?;
            tracing::warn!(
                "{} does not advertise {} Hz / {} ch (default is {} Hz / {} ch); trying anyway",
                device.name,
                capture.sample_rate,
                capture.channels,
                default_config.sample_rate().0,
                default_config.channels()
            );
        }

        let config = StreamConfig {
            channels: capture.channels,
            sample_rate: cpal::SampleRate(capture.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device_name: device.name.clone(),
            device: Some(device),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            events_rx: None,
            samples_captured: Arc::new(AtomicU64::new(0)),
            config,
            assembler: FrameAssembler::new(capture.frame_samples, capture.channels),
        })
    }

    /// Start capturing audio
    ///
    /// Returns once the stream is playing, or with the error that kept it
    /// from starting.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        let device = self
            .device
            .take()
            .ok_or_else(|| AudioError::StreamError("capture already consumed its device".into()))?;

        let (events_tx, events_rx) = unbounded_channel::<CaptureEvent>();
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        self.events_rx = Some(events_rx);

        let running = self.running.clone();
        let samples_captured = self.samples_captured.clone();
        let config = self.config.clone();

        self.samples_captured.store(0, Ordering::SeqCst);
        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let cpal_device = device.into_inner();
                let stream = build_stream(
                    &cpal_device,
                    &config,
                    events_tx,
                    running.clone(),
                    samples_captured,
                );

                let stream = match stream.and_then(|s| {
                    s.play()
                        .map_err(|e| AudioError::StreamError(e.to_string()))
                        .map(|_| s)
                }) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        running.store(false, Ordering::SeqCst);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }

                // Dropping the stream releases the device
                drop(stream);
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(
                    "Capturing from {} at {} Hz, {} ch",
                    self.device_name,
                    self.config.sample_rate.0,
                    self.config.channels
                );
                Ok(())
            }
            Ok(Err(e)) => {
                self.stop();
                Err(e)
            }
            Err(_) => {
                self.stop();
                Err(AudioError::StreamError("capture thread exited during startup".into()))
            }
        }
    }

    /// Stop capturing and join the stream thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            tracing::debug!("Capture thread for {} joined", self.device_name);
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Get total samples captured
    pub fn samples_captured(&self) -> u64 {
        self.samples_captured.load(Ordering::Relaxed)
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    events_tx: UnboundedSender<CaptureEvent>,
    running: Arc<AtomicBool>,
    samples_captured: Arc<AtomicU64>,
) -> Result<cpal::Stream, AudioError> {
    let error_tx = events_tx.clone();

    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    return;
                }
                samples_captured.fetch_add(data.len() as u64, Ordering::Relaxed);
                let _ = events_tx.send(Ok(data.to_vec()));
            },
            move |err| {
                let _ = error_tx.send(Err(AudioError::StreamError(err.to_string())));
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))
}

/// Wait for enough callback chunks to cut one frame
///
/// A stream error is returned as-is; a closed channel means the capture
/// thread is gone.
pub async fn next_frame_from(
    events: &mut UnboundedReceiver<CaptureEvent>,
    assembler: &mut FrameAssembler,
) -> Result<Bytes, AudioError> {
    loop {
        if let Some(frame) = assembler.pop_frame() {
            return Ok(frame);
        }

        match events.recv().await {
            Some(Ok(chunk)) => assembler.push(&chunk),
            Some(Err(e)) => return Err(e),
            None => return Err(AudioError::CaptureStopped),
        }
    }
}

impl PacketSource for AudioCapture {
    async fn next_frame(&mut self) -> Result<Bytes, AudioError> {
        let events = self.events_rx.as_mut().ok_or(AudioError::CaptureStopped)?;
        next_frame_from(events, &mut self.assembler).await
    }

    fn frame_bytes(&self) -> usize {
        self.assembler.frame_len() * 2
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
