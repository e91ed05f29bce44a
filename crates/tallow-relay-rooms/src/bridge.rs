//! The bidirectional byte pump between the two peers of a rendezvous room.
//!
//! The pump is transport-agnostic: callers adapt their real connection
//! (a WebSocket split, an mpsc channel pair, a mock in tests) into a
//! [`PeerLink`] and hand two of them to [`run_bridge`].

use std::future::Future;

use bytes::Bytes;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// One side of a bridged connection.
///
/// Implementations are expected to translate protocol-level ping/pong
/// frames (e.g. WebSocket control frames) into [`PeerEvent::Pong`] and
/// [`PeerLink::ping`].
pub trait PeerLink: Send {
    /// Write a binary payload out to this peer.
    fn send(&mut self, data: Bytes) -> impl Future<Output = Result<(), LinkClosed>> + Send;
    /// Send a transport-level ping.
    fn ping(&mut self) -> impl Future<Output = Result<(), LinkClosed>> + Send;
    /// Wait for the next event from this peer.
    fn recv(&mut self) -> impl Future<Output = PeerEvent> + Send;
}

/// An event surfaced by [`PeerLink::recv`].
pub enum PeerEvent {
    Data(Bytes),
    Pong,
    Closed,
}

/// Returned when a send fails because the peer's transport is gone.
#[derive(Debug)]
pub struct LinkClosed;

/// Tunables for [`run_bridge`], drawn directly from the rendezvous relay's
/// external configuration.
#[derive(Clone, Copy, Debug)]
pub struct BridgeConfig {
    /// Per-message read deadline, refreshed whenever either side is active.
    pub read_deadline: Duration,
    /// Total bytes (both directions combined) allowed before the bridge
    /// closes the room.
    pub max_bytes: u64,
    /// Closes the room if no traffic crosses it for this long.
    pub idle_timeout: Duration,
    /// How often each side is pinged.
    pub ping_interval: Duration,
    /// How long to wait for a pong before treating the side as dead.
    pub pong_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            read_deadline: Duration::from_secs(60),
            max_bytes: 10 * 1024 * 1024 * 1024,
            idle_timeout: Duration::from_secs(300),
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

/// Why [`run_bridge`] stopped pumping.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BridgeEndReason {
    /// Either side closed cleanly.
    Completed,
    ByteCapExceeded,
    IdleTimeout,
    PongTimeout,
    ReadDeadlineExceeded,
}

/// The outcome of a completed bridge run.
#[derive(Clone, Copy, Debug)]
pub struct BridgeOutcome {
    pub bytes_transferred: u64,
    pub duration: Duration,
    pub reason: BridgeEndReason,
}

struct Side<L: PeerLink> {
    link: L,
    last_activity: Instant,
    awaiting_pong_since: Option<Instant>,
}

impl<L: PeerLink> Side<L> {
    fn new(link: L, now: Instant) -> Self {
        Self {
            link,
            last_activity: now,
            awaiting_pong_since: None,
        }
    }
}

/// Pump bytes bidirectionally between `a` and `b` until one of the
/// conditions in `config` is reached or a link closes.
pub async fn run_bridge<A: PeerLink, B: PeerLink>(
    a: A,
    b: B,
    config: BridgeConfig,
) -> BridgeOutcome {
    let start = Instant::now();
    let mut a = Side::new(a, start);
    let mut b = Side::new(b, start);
    let mut bytes_transferred: u64 = 0;

    let mut ping_ticker_a = tokio::time::interval(config.ping_interval);
    ping_ticker_a.tick().await; // first tick fires immediately; consume it
    let mut ping_ticker_b = tokio::time::interval(config.ping_interval);
    ping_ticker_b.tick().await;
    let mut idle_check = tokio::time::interval((config.idle_timeout / 4).max(Duration::from_millis(1)));
    idle_check.tick().await;

    let reason = loop {
        tokio::select! {
            event = recv_with_deadline(&mut a.link, config.read_deadline) => {
                match event {
                    Ok(PeerEvent::Data(data)) => {
                        a.last_activity = Instant::now();
                        bytes_transferred += data.len() as u64;
                        if bytes_transferred > config.max_bytes {
                            break BridgeEndReason::ByteCapExceeded;
                        }
                        if b.link.send(data).await.is_err() {
                            break BridgeEndReason::Completed;
                        }
                        b.last_activity = Instant::now();
                    }
                    Ok(PeerEvent::Pong) => {
                        a.last_activity = Instant::now();
                        a.awaiting_pong_since = None;
                    }
                    Ok(PeerEvent::Closed) => break BridgeEndReason::Completed,
                    Err(ReadDeadlineExceeded) => break BridgeEndReason::ReadDeadlineExceeded,
                }
            }
            event = recv_with_deadline(&mut b.link, config.read_deadline) => {
                match event {
                    Ok(PeerEvent::Data(data)) => {
                        b.last_activity = Instant::now();
                        bytes_transferred += data.len() as u64;
                        if bytes_transferred > config.max_bytes {
                            break BridgeEndReason::ByteCapExceeded;
                        }
                        if a.link.send(data).await.is_err() {
                            break BridgeEndReason::Completed;
                        }
                        a.last_activity = Instant::now();
                    }
                    Ok(PeerEvent::Pong) => {
                        b.last_activity = Instant::now();
                        b.awaiting_pong_since = None;
                    }
                    Ok(PeerEvent::Closed) => break BridgeEndReason::Completed,
                    Err(ReadDeadlineExceeded) => break BridgeEndReason::ReadDeadlineExceeded,
                }
            }
            _ = ping_ticker_a.tick() => {
                if let Some(since) = a.awaiting_pong_since {
                    if since.elapsed() > config.pong_timeout {
                        break BridgeEndReason::PongTimeout;
                    }
                } else if a.link.ping().await.is_ok() {
                    a.awaiting_pong_since = Some(Instant::now());
                }
            }
            _ = ping_ticker_b.tick() => {
                if let Some(since) = b.awaiting_pong_since {
                    if since.elapsed() > config.pong_timeout {
                        break BridgeEndReason::PongTimeout;
                    }
                } else if b.link.ping().await.is_ok() {
                    b.awaiting_pong_since = Some(Instant::now());
                }
            }
            _ = idle_check.tick() => {
                let last = a.last_activity.max(b.last_activity);
                if last.elapsed() > config.idle_timeout {
                    break BridgeEndReason::IdleTimeout;
                }
            }
        }
    };

    let outcome = BridgeOutcome {
        bytes_transferred,
        duration: start.elapsed(),
        reason,
    };
    debug!(
        bytes = outcome.bytes_transferred,
        reason = ?outcome.reason,
        "bridge finished"
    );
    outcome
}

struct ReadDeadlineExceeded;

async fn recv_with_deadline<L: PeerLink>(
    link: &mut L,
    deadline: Duration,
) -> Result<PeerEvent, ReadDeadlineExceeded> {
    tokio::time::timeout(deadline, link.recv())
        .await
        .map_err(|_| ReadDeadlineExceeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    enum MockOp {
        Data(Vec<u8>),
        Ping,
        Close,
    }

    /// A `PeerLink` backed by plain channels, for driving the bridge
    /// deterministically in tests.
    struct MockLink {
        inbound: mpsc::Receiver<MockOp>,
        outbound: mpsc::Sender<Vec<u8>>,
        pongs: mpsc::Sender<()>,
    }

    impl PeerLink for MockLink {
        async fn send(&mut self, data: Bytes) -> Result<(), LinkClosed> {
            self.outbound.send(data.to_vec()).await.map_err(|_| LinkClosed)
        }

        async fn ping(&mut self) -> Result<(), LinkClosed> {
            let _ = self.pongs.send(()).await;
            Ok(())
        }

        async fn recv(&mut self) -> PeerEvent {
            match self.inbound.recv().await {
                Some(MockOp::Data(d)) => PeerEvent::Data(Bytes::from(d)),
                Some(MockOp::Ping) => PeerEvent::Pong,
                Some(MockOp::Close) | None => PeerEvent::Closed,
            }
        }
    }

    fn mock_pair() -> (
        MockLink,
        mpsc::Sender<MockOp>,
        mpsc::Receiver<Vec<u8>>,
        MockLink,
        mpsc::Sender<MockOp>,
        mpsc::Receiver<Vec<u8>>,
    ) {
        let (in_a_tx, in_a_rx) = mpsc::channel(16);
        let (out_a_tx, out_a_rx) = mpsc::channel(16);
        let (pong_a_tx, mut pong_a_rx) = mpsc::channel(16);
        tokio::spawn(async move { while pong_a_rx.recv().await.is_some() {} });

        let (in_b_tx, in_b_rx) = mpsc::channel(16);
        let (out_b_tx, out_b_rx) = mpsc::channel(16);
        let (pong_b_tx, mut pong_b_rx) = mpsc::channel(16);
        tokio::spawn(async move { while pong_b_rx.recv().await.is_some() {} });

        let a = MockLink {
            inbound: in_a_rx,
            outbound: out_a_tx,
            pongs: pong_a_tx,
        };
        let b = MockLink {
            inbound: in_b_rx,
            outbound: out_b_tx,
            pongs: pong_b_tx,
        };
        (a, in_a_tx, out_a_rx, b, in_b_tx, out_b_rx)
    }

    #[tokio::test]
    async fn bytes_flow_in_both_directions() {
        let (a, in_a, mut out_a_rx, b, in_b, mut out_b_rx) = mock_pair();
        let config = BridgeConfig {
            read_deadline: Duration::from_secs(5),
            ..BridgeConfig::default()
        };

        let handle = tokio::spawn(run_bridge(a, b, config));

        in_a.send(MockOp::Data(b"from-a".to_vec())).await.unwrap();
        in_b.send(MockOp::Data(b"from-b".to_vec())).await.unwrap();
        assert_eq!(out_b_rx.recv().await.unwrap(), b"from-a".to_vec());
        assert_eq!(out_a_rx.recv().await.unwrap(), b"from-b".to_vec());

        drop(in_a);
        drop(in_b);
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.reason, BridgeEndReason::Completed);
        assert_eq!(outcome.bytes_transferred, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn byte_cap_stops_the_bridge() {
        let (a, in_a, _out_a_rx, b, _in_b, mut out_b_rx) = mock_pair();
        let config = BridgeConfig {
            read_deadline: Duration::from_secs(5),
            max_bytes: 4,
            idle_timeout: Duration::from_secs(3600),
            ..BridgeConfig::default()
        };

        let handle = tokio::spawn(run_bridge(a, b, config));
        in_a.send(MockOp::Data(vec![0u8; 8])).await.unwrap();
        let _ = out_b_rx.recv().await;

        let outcome = handle.await.unwrap();
        assert_eq!(outcome.reason, BridgeEndReason::ByteCapExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_closes_a_silent_room() {
        let (a, _in_a, _out_a_rx, b, _in_b, _out_b_rx) = mock_pair();
        let config = BridgeConfig {
            read_deadline: Duration::from_secs(3600),
            idle_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(3600),
            ..BridgeConfig::default()
        };

        let outcome = run_bridge(a, b, config).await;
        assert_eq!(outcome.reason, BridgeEndReason::IdleTimeout);
    }
}
