//! The room manager: an `id -> room` map and a `code -> id` index for
//! short-lived, two-peer rendezvous rooms.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, watch, Notify, RwLock};
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::err::RoomError;
use crate::wordlist::WORDLIST;

/// Channel depth for the byte queue feeding each side of a room.
const PEER_CHANNEL_CAPACITY: usize = 64;

/// Tunables for a [`RoomManager`].
#[derive(Clone, Copy, Debug)]
pub struct RoomManagerConfig {
    /// Maximum number of concurrently open rooms.
    pub max_rooms: usize,
    /// TTL applied when a creator does not request one.
    pub default_expiry: Duration,
    /// Upper bound on any requested TTL.
    pub max_expiry: Duration,
    /// Number of wordlist entries combined into one room code.
    pub code_word_count: usize,
    /// Bounded retries when a generated code collides with an active one.
    pub max_code_attempts: u32,
    /// How often [`RoomManager::sweep_expired`] should be invoked.
    pub cleanup_interval: Duration,
}

impl Default for RoomManagerConfig {
    fn default() -> Self {
        Self {
            max_rooms: 10_000,
            default_expiry: Duration::from_secs(24 * 3600),
            max_expiry: Duration::from_secs(24 * 3600),
            code_word_count: 3,
            max_code_attempts: 20,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Which of the two room slots a peer occupies.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PeerRole {
    Creator,
    Joiner,
}

struct RoomState {
    code: String,
    created_at: Instant,
    expires_at: Instant,
    creator_tx: mpsc::Sender<Vec<u8>>,
    joiner_tx: Option<mpsc::Sender<Vec<u8>>>,
    peer_joined: Arc<Notify>,
    closed: Arc<Notify>,
    is_closed: bool,
}

/// Returned from [`RoomManager::create_room`].
pub struct CreatedRoom {
    pub room_id: String,
    pub code: String,
    pub expires_at: Instant,
    /// Delivers bytes written by the joiner once one arrives.
    pub rx: mpsc::Receiver<Vec<u8>>,
    /// Resolves once, the first time a joiner attaches to this room.
    pub peer_joined: Arc<Notify>,
    /// Resolves once, when the room closes (TTL expiry or explicit close).
    pub closed: Arc<Notify>,
}

impl std::fmt::Debug for CreatedRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedRoom")
            .field("room_id", &self.room_id)
            .field("code", &self.code)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Returned from [`RoomManager::join_room`].
pub struct JoinedRoom {
    pub room_id: String,
    /// Delivers bytes written by the creator.
    pub rx: mpsc::Receiver<Vec<u8>>,
}

impl std::fmt::Debug for JoinedRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinedRoom").field("room_id", &self.room_id).finish_non_exhaustive()
    }
}

/// Aggregate counters returned by [`RoomManager::stats`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RoomManagerStats {
    pub active_rooms: usize,
}

struct Inner {
    rooms: HashMap<String, RoomState>,
    codes: HashMap<String, String>,
}

/// Owns every active rendezvous room.
///
/// At most two peers ever occupy a room: a creator and a joiner. Room
/// codes are unique among *active* rooms only; a closed room's code may
/// be reissued.
#[derive(Clone)]
pub struct RoomManager {
    config: RoomManagerConfig,
    inner: Arc<RwLock<Inner>>,
}

impl RoomManager {
    pub fn new(config: RoomManagerConfig) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(Inner {
                rooms: HashMap::new(),
                codes: HashMap::new(),
            })),
        }
    }

    /// Allocate a new room with `requested_ttl` clamped to `max_expiry`
    /// (or `default_expiry` if `None`), generating a unique word code.
    pub async fn create_room(
        &self,
        requested_ttl: Option<Duration>,
    ) -> Result<CreatedRoom, RoomError> {
        let mut inner = self.inner.write().await;
        if inner.rooms.len() >= self.config.max_rooms {
            return Err(RoomError::MaxRoomsReached);
        }

        let ttl = requested_ttl
            .unwrap_or(self.config.default_expiry)
            .min(self.config.max_expiry);
        let code = generate_code(
            &inner.codes,
            self.config.code_word_count,
            self.config.max_code_attempts,
        )?;
        let room_id = generate_room_id();
        let now = Instant::now();
        let expires_at = now + ttl;
        let (tx, rx) = mpsc::channel(PEER_CHANNEL_CAPACITY);
        let peer_joined = Arc::new(Notify::new());
        let closed = Arc::new(Notify::new());

        inner.codes.insert(code.clone(), room_id.clone());
        inner.rooms.insert(
            room_id.clone(),
            RoomState {
                code: code.clone(),
                created_at: now,
                expires_at,
                creator_tx: tx,
                joiner_tx: None,
                peer_joined: peer_joined.clone(),
                closed: closed.clone(),
                is_closed: false,
            },
        );

        info!(room_id = %room_id, code = %code, "room created");
        Ok(CreatedRoom {
            room_id,
            code,
            expires_at,
            rx,
            peer_joined,
            closed,
        })
    }

    /// Attach a joiner to the room addressed by `code` (case-insensitive).
    pub async fn join_room(&self, code: &str) -> Result<JoinedRoom, RoomError> {
        let key = normalize_code(code);
        let mut inner = self.inner.write().await;
        let room_id = inner.codes.get(&key).cloned().ok_or(RoomError::RoomNotFound)?;

        let state = inner.rooms.get_mut(&room_id).ok_or(RoomError::RoomNotFound)?;
        if state.is_closed || Instant::now() >= state.expires_at {
            return Err(RoomError::RoomExpired);
        }
        if state.joiner_tx.is_some() {
            return Err(RoomError::RoomFull);
        }

        let (tx, rx) = mpsc::channel(PEER_CHANNEL_CAPACITY);
        state.joiner_tx = Some(tx);
        state.peer_joined.notify_one();

        info!(room_id = %room_id, "peer joined room");
        Ok(JoinedRoom { room_id, rx })
    }

    /// Return the channel used to deliver bytes to `role` in `room_id`,
    /// or `None` if the room, or that slot, does not exist.
    pub async fn sender_to(&self, room_id: &str, role: PeerRole) -> Option<mpsc::Sender<Vec<u8>>> {
        let inner = self.inner.read().await;
        let state = inner.rooms.get(room_id)?;
        match role {
            PeerRole::Creator => Some(state.creator_tx.clone()),
            PeerRole::Joiner => state.joiner_tx.clone(),
        }
    }

    /// Close a room, notifying anyone waiting on `closed`. Idempotent:
    /// returns `false` if the room was already closed or unknown.
    pub async fn close_room(&self, room_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(state) = inner.rooms.get_mut(room_id) else {
            return false;
        };
        if state.is_closed {
            return false;
        }
        state.is_closed = true;
        state.closed.notify_one();
        let code = state.code.clone();
        inner.codes.remove(&code);
        inner.rooms.remove(room_id);
        debug!(room_id, "room closed");
        true
    }

    /// Either peer disconnecting ends the room: there is no concept of a
    /// lone surviving peer in a two-party rendezvous.
    pub async fn peer_disconnected(&self, room_id: &str) -> bool {
        self.close_room(room_id).await
    }

    /// Close every room whose `expires_at` has passed. Returns the number closed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = {
            let inner = self.inner.read().await;
            inner
                .rooms
                .iter()
                .filter(|(_, s)| !s.is_closed && now >= s.expires_at)
                .map(|(id, _)| id.clone())
                .collect()
        };
        let mut closed = 0;
        for room_id in expired {
            if self.close_room(&room_id).await {
                closed += 1;
            }
        }
        closed
    }

    /// Run [`RoomManager::sweep_expired`] on `config.cleanup_interval`
    /// until `shutdown` resolves to `true`.
    pub async fn run_expiry_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.cleanup_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let closed = self.sweep_expired().await;
                    if closed > 0 {
                        debug!(closed, "expiry sweep closed stale rooms");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    pub async fn stats(&self) -> RoomManagerStats {
        let inner = self.inner.read().await;
        RoomManagerStats {
            active_rooms: inner.rooms.len(),
        }
    }

    #[cfg(test)]
    async fn created_at(&self, room_id: &str) -> Option<Instant> {
        let inner = self.inner.read().await;
        inner.rooms.get(room_id).map(|s| s.created_at)
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

fn generate_code(
    existing: &HashMap<String, String>,
    word_count: usize,
    max_attempts: u32,
) -> Result<String, RoomError> {
    let mut rng = rand::thread_rng();
    for _ in 0..max_attempts.max(1) {
        let code = (0..word_count)
            .map(|_| WORDLIST[rng.gen_range(0..WORDLIST.len())])
            .collect::<Vec<_>>()
            .join(" ");
        if !existing.contains_key(&normalize_code(&code)) {
            return Ok(code);
        }
    }
    Err(RoomError::CodeGenerationFailed {
        attempts: max_attempts,
    })
}

fn generate_room_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RoomManagerConfig {
        RoomManagerConfig {
            max_rooms: 4,
            default_expiry: Duration::from_secs(1800),
            max_expiry: Duration::from_secs(3600),
            code_word_count: 3,
            max_code_attempts: 20,
            cleanup_interval: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn create_then_join_links_both_slots() {
        let mgr = RoomManager::new(config());
        let created = mgr.create_room(None).await.unwrap();
        assert_eq!(created.code.split(' ').count(), 3);

        let joined = mgr.join_room(&created.code.to_uppercase()).await.unwrap();
        assert_eq!(joined.room_id, created.room_id);

        let to_joiner = mgr.sender_to(&created.room_id, PeerRole::Joiner).await.unwrap();
        to_joiner.send(b"hello".to_vec()).await.unwrap();
        drop(to_joiner);

        let mut joined_rx = joined.rx;
        assert_eq!(joined_rx.recv().await.unwrap(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn second_join_attempt_is_rejected_as_full() {
        let mgr = RoomManager::new(config());
        let created = mgr.create_room(None).await.unwrap();
        mgr.join_room(&created.code).await.unwrap();
        let err = mgr.join_room(&created.code).await.unwrap_err();
        assert_eq!(err, RoomError::RoomFull);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let mgr = RoomManager::new(config());
        let err = mgr.join_room("nonexistent code here").await.unwrap_err();
        assert_eq!(err, RoomError::RoomNotFound);
    }

    #[tokio::test]
    async fn requested_ttl_is_clamped_to_max_expiry() {
        let mgr = RoomManager::new(config());
        let created = mgr
            .create_room(Some(Duration::from_secs(999_999)))
            .await
            .unwrap();
        let created_at = mgr.created_at(&created.room_id).await.unwrap();
        assert_eq!(created.expires_at - created_at, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn max_rooms_reached_is_enforced() {
        let mgr = RoomManager::new(config());
        for _ in 0..4 {
            mgr.create_room(None).await.unwrap();
        }
        let err = mgr.create_room(None).await.unwrap_err();
        assert_eq!(err, RoomError::MaxRoomsReached);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_frees_the_code() {
        let mgr = RoomManager::new(config());
        let created = mgr.create_room(None).await.unwrap();
        assert!(mgr.close_room(&created.room_id).await);
        assert!(!mgr.close_room(&created.room_id).await);
        // Room gone means the code is free again for lookup purposes.
        assert_eq!(
            mgr.join_room(&created.code).await.unwrap_err(),
            RoomError::RoomNotFound
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_expired_closes_past_due_rooms_only() {
        let mgr = RoomManager::new(RoomManagerConfig {
            default_expiry: Duration::from_secs(10),
            ..config()
        });
        let short = mgr.create_room(Some(Duration::from_secs(5))).await.unwrap();
        let long = mgr.create_room(Some(Duration::from_secs(3600))).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        let closed = mgr.sweep_expired().await;
        assert_eq!(closed, 1);

        let stats = mgr.stats().await;
        assert_eq!(stats.active_rooms, 1);
        assert_eq!(
            mgr.join_room(&short.code).await.unwrap_err(),
            RoomError::RoomNotFound
        );
        assert!(mgr.join_room(&long.code).await.is_ok());
    }

    #[tokio::test]
    async fn no_two_active_rooms_share_a_code() {
        let mgr = RoomManager::new(RoomManagerConfig {
            max_rooms: 50,
            ..config()
        });
        let mut codes = std::collections::HashSet::new();
        for _ in 0..50 {
            let created = mgr.create_room(None).await.unwrap();
            assert!(codes.insert(normalize_code(&created.code)));
        }
    }
}
