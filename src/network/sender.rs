//! Paced packet sender
//!
//! Pulls one frame from a [`PacketSource`], sends it as one datagram and
//! sleeps a fixed interval. There is no rate adaptation.

use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use crate::audio::PacketSource;
use crate::config::NetworkConfig;
use crate::constants::MAX_DATAGRAM_SIZE;
use crate::error::{NetworkError, Result};
use crate::network::udp::{create_socket, unspecified_for, UdpSocket};
use crate::protocol::{Packet, SequenceMode};

/// Sender statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
}

/// UDP sender for one audio stream
pub struct PacketSender {
    socket: UdpSocket,
    target: SocketAddr,
    mode: SequenceMode,
    interval: Duration,
    next_sequence: u16,
    stats: SenderStats,
}

impl PacketSender {
    /// Bind an ephemeral socket for sending to `config.target_address`
    pub fn new(config: &NetworkConfig, mode: SequenceMode, interval: Duration) -> Result<Self> {
        let target = config.target_address;
        let socket = create_socket(
            unspecified_for(target),
            None,
            config.send_buffer_size,
        )?;
        Ok(Self::with_socket(socket, target, mode, interval))
    }

    pub fn with_socket(
        socket: UdpSocket,
        target: SocketAddr,
        mode: SequenceMode,
        interval: Duration,
    ) -> Self {
        Self {
            socket,
            target,
            mode,
            interval,
            next_sequence: 0,
            stats: SenderStats::default(),
        }
    }

    /// Build the datagram for one frame and advance the sequence counter
    pub fn build_datagram(&mut self, frame: &[u8]) -> std::result::Result<Bytes, NetworkError> {
        match self.mode {
            SequenceMode::Prefixed => {
                let packet = Packet::new(self.next_sequence, Bytes::copy_from_slice(frame));
                let datagram = packet.encode()?;
                self.next_sequence = self.next_sequence.wrapping_add(1);
                Ok(datagram)
            }
            SequenceMode::Raw if frame.len() > MAX_DATAGRAM_SIZE => {
                Err(NetworkError::PacketTooLarge(frame.len()))
            }
            SequenceMode::Raw => Ok(Bytes::copy_from_slice(frame)),
        }
    }

    /// Send one frame
    pub async fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        let datagram = self.build_datagram(frame)?;
        let sent = self
            .socket
            .send_to(&datagram, self.target)
            .await
            .map_err(|e| NetworkError::SendFailed(format!("{}: {}", self.target, e)))?;
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += sent as u64;
        Ok(())
    }

    /// Capture, send, wait; until `shutdown` resolves or an error occurs
    ///
    /// Shutdown is observed between packets, never in the middle of a send.
    pub async fn run<S, F>(&mut self, source: &mut S, shutdown: F) -> Result<SenderStats>
    where
        S: PacketSource,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            "Streaming {} byte frames to {} every {:?} ({:?})",
            source.frame_bytes(),
            self.target,
            self.interval,
            self.mode
        );

        loop {
            let frame = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                frame = source.next_frame() => frame?,
            };

            self.send_frame(&frame).await?;

            if self.stats.packets_sent % 250 == 0 {
                tracing::debug!(
                    "{} packets sent, {:.1} KB",
                    self.stats.packets_sent,
                    self.stats.bytes_sent as f64 / 1024.0
                );
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(
            "Sender stopped after {} packets ({} bytes)",
            self.stats.packets_sent,
            self.stats.bytes_sent
        );
        Ok(self.stats.clone())
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    pub fn next_sequence(&self) -> u16 {
        self.next_sequence
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
