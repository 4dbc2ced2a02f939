use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

pub type PlayerId = Uuid;

/// Emoji avatars are short strings; doodled avatars arrive as a data URL.
pub const MAX_AVATAR_LEN: usize = 10;
pub const MAX_CUSTOM_AVATAR_LEN: usize = 16 * 1024;

/// One seat in a room, bound to a live connection. The outbound sender is
/// the connection's message pump; everything else is game state that
/// survives only as long as the connection does.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_avatar: Option<String>,
    pub score: u32,
    pub is_host: bool,
    pub is_drawer: bool,
    #[serde(skip)]
    sender: UnboundedSender<Message>,
}

impl Player {
    pub fn new(
        name: String,
        avatar: String,
        custom_avatar: Option<String>,
        is_host: bool,
        sender: UnboundedSender<Message>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            avatar,
            custom_avatar,
            score: 0,
            is_host,
            is_drawer: false,
            sender,
        }
    }

    /// Send a message to this player's connection. Returns false if the
    /// connection's channel is gone; the caller treats that as a disconnect.
    pub fn send(&self, message: Message) -> bool {
        self.sender.send(message).is_ok()
    }
}

/// Validate a display name before it enters a room: 1-20 characters after
/// trimming, nothing that smells like markup or script injection.
pub fn validate_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 20 {
        return false;
    }
    let lower = trimmed.to_lowercase();
    !(lower.contains('<') || lower.contains('>') || lower.contains("script") || lower.contains("javascript:"))
}
