use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Duration;

use crate::game::room::GameRoom;

pub type RoomHandle = Arc<Mutex<GameRoom>>;

pub const ROOM_CODE_LEN: usize = 8;
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// How long an empty room survives, so a page refresh can rejoin the same
/// code before it is reaped.
pub const EMPTY_ROOM_GRACE: Duration = Duration::from_secs(120);

/// All live rooms, keyed by their shareable code. The registry lock guards
/// only the map; each room serializes its own mutation behind its mutex.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, RoomHandle>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room under a fresh code. The code space is large relative
    /// to concurrent-room counts, but a collision is still re-rolled
    /// rather than clobbering an existing room.
    pub async fn create(&self) -> (String, RoomHandle) {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let candidate = generate_room_code(&mut rand::thread_rng());
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let handle = Arc::new(Mutex::new(GameRoom::new(code.clone())));
        rooms.insert(code.clone(), handle.clone());
        (code, handle)
    }

    pub async fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(code).cloned()
    }

    pub async fn remove(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.write().await.remove(code)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Schedule deletion of a now-empty room. The vacancy token pins the
    /// emptiness observed at schedule time: any join bumps it, turning a
    /// stale sweep into a no-op even if the room emptied again since.
    pub fn schedule_vacancy_sweep(
        self: &Arc<Self>,
        code: String,
        room: RoomHandle,
        vacancy: u64,
    ) {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(EMPTY_ROOM_GRACE).await;
            let guard = room.lock().await;
            if guard.is_empty() && guard.vacancy() == vacancy {
                drop(guard);
                if registry.remove(&code).await.is_some() {
                    tracing::info!(room = %code, "deleted empty room after grace period");
                }
            }
        });
    }
}

fn generate_room_code<R: Rng>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| {
            let i = rng.gen_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[i] as char
        })
        .collect()
}
