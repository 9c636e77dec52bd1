//! Measuring receiver
//!
//! [`ReceiverContext`] owns the bound socket, the stream state and the
//! metrics log. [`ReceiverContext::run`] is the only loop: one datagram per
//! iteration, processed to completion before the next receive.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Instant;

use crate::config::AppConfig;
use crate::error::{NetworkError, Result};
use crate::metrics::{MetricsLog, MetricsRow, StreamState};
use crate::network::udp::{create_socket, UdpSocket};
use crate::protocol::{decode_sequence, WrapPolicy};

/// Receiver statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub packets_received: u64,
    pub bytes_received: u64,
    pub invalid_packets: u64,
}

/// Outcome of handling one datagram
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Row(MetricsRow),
    Dropped(usize),
}

/// Everything the receive loop needs, with a single owner
pub struct ReceiverContext<W: std::io::Write> {
    socket: UdpSocket,
    state: StreamState,
    log: MetricsLog<W>,
    stats: ReceiverStats,
    max_datagram_size: usize,
    print_status: bool,
}

impl ReceiverContext<std::fs::File> {
    /// Bind the socket and create the log file from configuration
    pub fn bind(config: &AppConfig) -> Result<Self> {
        let socket = create_socket(
            config.network.bind_address,
            config.network.recv_buffer_size,
            None,
        )?;
        let log = MetricsLog::create(&config.metrics.log_path)?;
        tracing::info!(
            "Listening on {}, logging to {}",
            config.network.bind_address,
            config.metrics.log_path.display()
        );
        let mut context = Self::new(socket, log, config.stream.wrap_policy);
        context.max_datagram_size = config.network.max_datagram_size;
        context.print_status = config.metrics.print_status;
        Ok(context)
    }
}

impl<W: std::io::Write> ReceiverContext<W> {
    /// Stream start time is taken here
    pub fn new(socket: UdpSocket, log: MetricsLog<W>, policy: WrapPolicy) -> Self {
        Self {
            socket,
            state: StreamState::new(Instant::now(), policy),
            log,
            stats: ReceiverStats::default(),
            max_datagram_size: crate::constants::MAX_DATAGRAM_SIZE,
            print_status: true,
        }
    }

    pub fn set_print_status(&mut self, enabled: bool) {
        self.print_status = enabled;
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Process one datagram that arrived at `arrival`
    ///
    /// Short datagrams are counted and dropped without touching the stream
    /// state or the log.
    pub fn handle_datagram(&mut self, datagram: &[u8], arrival: Instant) -> Result<Received> {
        let seq = match decode_sequence(datagram) {
            Ok(seq) => seq,
            Err(e) => {
                self.stats.invalid_packets += 1;
                tracing::warn!("Dropping datagram: {}", e);
                return Ok(Received::Dropped(datagram.len()));
            }
        };

        self.stats.packets_received += 1;
        self.stats.bytes_received += datagram.len() as u64;

        let row = self.state.observe(seq, arrival);
        self.log.append(&row)?;

        if self.print_status {
            println!(
                "Time: {:.2}s, Jitter: {:.2} ms, Packet Loss: {}",
                row.elapsed_seconds, row.jitter_ms, row.lost_packets
            );
        }
        Ok(Received::Row(row))
    }

    /// Receive until `shutdown` resolves or a transport error occurs
    ///
    /// Consumes the context; the socket is closed and the log flushed on
    /// every exit path. Shutdown is checked before each receive.
    pub async fn run<F>(mut self, shutdown: F) -> Result<ReceiverStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = vec![0u8; self.max_datagram_size];

        let outcome: Result<()> = loop {
            let received = tokio::select! {
                biased;
                _ = &mut shutdown => break Ok(()),
                received = self.socket.recv_from(&mut buf) => received,
            };

            let (len, addr) = match received {
                Ok(r) => r,
                Err(e) => break Err(NetworkError::ReceiveFailed(e.to_string()).into()),
            };
            let arrival = Instant::now();
            tracing::trace!("{} bytes from {}", len, addr);

            if let Err(e) = self.handle_datagram(&buf[..len], arrival) {
                break Err(e);
            }
        };

        let Self { socket, log, stats, .. } = self;
        drop(socket);
        let rows = log.rows_written();
        let closed = log.finish();

        tracing::info!(
            "Receiver stopped: {} packets ({} bytes), {} invalid, {} rows logged",
            stats.packets_received,
            stats.bytes_received,
            stats.invalid_packets,
            rows
        );

        outcome?;
        closed?;
        Ok(stats)
    }
}

/// Bind from configuration and run until `shutdown`
pub async fn run_receiver<F>(config: &AppConfig, shutdown: F) -> Result<ReceiverStats>
where
    F: Future<Output = ()>,
{
    ReceiverContext::bind(config)?.run(shutdown).await
}

/// Create a receiver on an explicit address and log path
pub fn bind_receiver(
    addr: SocketAddr,
    log_path: &Path,
    policy: WrapPolicy,
) -> Result<ReceiverContext<std::fs::File>> {
    let mut config = AppConfig::default();
    config.network.bind_address = addr;
    config.metrics.log_path = log_path.to_path_buf();
    config.stream.wrap_policy = policy;
    ReceiverContext::bind(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn memory_context() -> ReceiverContext<Vec<u8>> {
        let socket = create_socket("127.0.0.1:0".parse().unwrap(), None, None).unwrap();
        let log = MetricsLog::new(Vec::new()).unwrap();
        let mut ctx = ReceiverContext::new(socket, log, WrapPolicy::Signed);
        ctx.set_print_status(false);
        ctx
    }

    #[tokio::test]
    async fn test_scenario_through_context() {
        let mut ctx = memory_context().await;
        let start = ctx.state().start();
        let mut lost = Vec::new();
        for (seq, t) in [(0u16, 0.00), (1, 0.02), (2, 0.04), (5, 0.10), (6, 0.12)] {
            let arrival = start + Duration::from_secs_f64(t);
            match ctx.handle_datagram(&seq.to_be_bytes(), arrival).unwrap() {
                Received::Row(row) => lost.push(row.lost_packets),
                Received::Dropped(_) => panic!("valid datagram dropped"),
            }
        }
        assert_eq!(lost, vec![0, 0, 0, 2, 2]);
        assert!((ctx.state().jitter() - 0.0075).abs() < 1e-6);
        assert_eq!(ctx.stats().packets_received, 5);
    }

    #[tokio::test]
    async fn test_malformed_datagram_leaves_state_alone() {
        let mut ctx = memory_context().await;
        let start = ctx.state().start();
        ctx.handle_datagram(&[0, 0, 1], start).unwrap();
        ctx.handle_datagram(&[0, 1, 1], start + Duration::from_millis(20)).unwrap();

        let expected = ctx.state().expected_seq();
        let lost = ctx.state().lost_packets();
        let jitter = ctx.state().jitter();

        let outcome = ctx
            .handle_datagram(&[0x42], start + Duration::from_millis(30))
            .unwrap();
        assert_eq!(outcome, Received::Dropped(1));
        assert_eq!(ctx.state().expected_seq(), expected);
        assert_eq!(ctx.state().lost_packets(), lost);
        assert_eq!(ctx.state().jitter(), jitter);
        assert_eq!(ctx.stats().invalid_packets, 1);
        assert_eq!(ctx.stats().packets_received, 2);

        // the next valid packet still measures from the last valid arrival
        ctx.handle_datagram(&[0, 2], start + Duration::from_millis(40)).unwrap();
        assert!((ctx.state().jitter() - jitter - 0.02 / 16.0).abs() < 1e-9);
        assert_eq!(ctx.state().lost_packets(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_and_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.log");
        let mut ctx = bind_receiver("127.0.0.1:0".parse().unwrap(), &path, WrapPolicy::Signed).unwrap();
        ctx.set_print_status(false);
        let addr = ctx.local_addr().unwrap();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(ctx.run(async {
            let _ = stop_rx.await;
        }));

        let client = create_socket("127.0.0.1:0".parse().unwrap(), None, None).unwrap();
        for seq in [0u16, 1, 3] {
            client.send_to(&seq.to_be_bytes(), addr).await.unwrap();
        }
        client.send_to(&[9], addr).await.unwrap();

        // wait until all four datagrams are processed
        let mut rows = Vec::new();
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            rows = crate::metrics::read_log(&path).unwrap();
            if rows.len() == 3 {
                break;
            }
        }
        assert_eq!(rows.len(), 3);
        let _ = stop_tx.send(());

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.packets_received, 3);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Time,Jitter,PacketLoss\n"));
        assert!(text.ends_with('\n'));
        let rows = crate::metrics::read_log(&path).unwrap();
        assert_eq!(rows.last().unwrap().lost_packets, 1);
    }

    #[tokio::test]
    async fn test_run_receiver_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.network.bind_address = "127.0.0.1:0".parse().unwrap();
        config.metrics.log_path = dir.path().join("metrics.log");
        config.metrics.print_status = false;

        let stats = run_receiver(&config, tokio::time::sleep(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(stats, ReceiverStats::default());

        let text = std::fs::read_to_string(&config.metrics.log_path).unwrap();
        assert_eq!(text, "Time,Jitter,PacketLoss\n");
    }
}
