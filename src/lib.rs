pub mod drawing;
pub mod error;
pub mod game;
pub mod room;
pub mod websocket;

use std::sync::Arc;

use room::RoomRegistry;

/// Application state shared across all connections
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RoomRegistry::new()),
        }
    }
}
