use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::drawing::event::{DrawEvent, FillAction, StrokePoint};
use crate::error::GameError;
use crate::game::room::GamePhase;
use crate::game::settings::GameSettings;
use crate::room::player::{Player, PlayerId};

pub const MAX_CHAT_LEN: usize = 200;
pub const MAX_GALLERY_IMAGE_LEN: usize = 512 * 1024;

/// Chat line shown in the shared stream. System lines (joins, host
/// migration, round outcomes) originate server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
    pub text: String,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub is_correct: bool,
    pub timestamp: u64,
}

impl ChatMessage {
    pub fn system(text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: "System".to_string(),
            sender_avatar: None,
            text,
            is_system: true,
            is_correct: false,
            timestamp: now_millis(),
        }
    }

    pub fn from_player(sender: &Player, text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.name.clone(),
            sender_avatar: Some(sender.avatar.clone()),
            text,
            is_system: false,
            is_correct: false,
            timestamp: now_millis(),
        }
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One finished drawing, pushed by the drawer's client at round-over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub word: String,
    pub drawer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawer_avatar: Option<String>,
    /// Data-URL raster snapshot, size capped.
    pub image: String,
}

/// In-game events that flow through the rate-limited `game_event` intent,
/// in both directions. Canvas events are accepted only from the current
/// drawer while the room is in the drawing phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum GameEvent {
    #[serde(rename = "DRAW_POINT")]
    DrawPoint(StrokePoint),
    #[serde(rename = "END_STROKE")]
    EndStroke,
    #[serde(rename = "FILL_CANVAS")]
    FillCanvas(FillAction),
    #[serde(rename = "UNDO_ACTION")]
    UndoAction,
    #[serde(rename = "CLEAR_CANVAS")]
    ClearCanvas,
    #[serde(rename = "CHAT_MESSAGE")]
    ChatMessage(ChatMessage),
    #[serde(rename = "EMOJI_REACTION")]
    EmojiReaction { emoji: String },
    #[serde(rename = "ADD_GALLERY_ITEM")]
    AddGalleryItem(GalleryItem),
}

impl GameEvent {
    /// The canvas operation this event represents, if any. Used for the
    /// replay log; undo is deliberately not a log operation.
    pub fn as_draw_event(&self) -> Option<DrawEvent> {
        match self {
            GameEvent::DrawPoint(p) => Some(DrawEvent::Stroke(p.clone())),
            GameEvent::EndStroke => Some(DrawEvent::StrokeEnd),
            GameEvent::FillCanvas(f) => Some(DrawEvent::Fill(f.clone())),
            GameEvent::ClearCanvas => Some(DrawEvent::Clear),
            _ => None,
        }
    }

    pub fn is_canvas_event(&self) -> bool {
        matches!(
            self,
            GameEvent::DrawPoint(_)
                | GameEvent::EndStroke
                | GameEvent::FillCanvas(_)
                | GameEvent::UndoAction
                | GameEvent::ClearCanvas
        )
    }
}

/// Everything a client may ask of the server. Unknown types fail to parse
/// and are reported back instead of being silently ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientIntent {
    #[serde(rename = "create_room")]
    CreateRoom {
        name: String,
        avatar: String,
        #[serde(default, rename = "customAvatar")]
        custom_avatar: Option<String>,
    },
    #[serde(rename = "join_room")]
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: String,
        name: String,
        avatar: String,
        #[serde(default, rename = "customAvatar")]
        custom_avatar: Option<String>,
    },
    #[serde(rename = "update_settings")]
    UpdateSettings(GameSettings),
    #[serde(rename = "start_game")]
    StartGame,
    #[serde(rename = "get_words")]
    GetWords,
    #[serde(rename = "select_word")]
    SelectWord(String),
    #[serde(rename = "submit_guess")]
    SubmitGuess { text: String },
    #[serde(rename = "play_again")]
    PlayAgain,
    #[serde(rename = "game_event")]
    GameEvent(GameEvent),
}

impl ClientIntent {
    pub fn parse(text: &str) -> Result<Self, GameError> {
        serde_json::from_str(text).map_err(|e| GameError::Protocol(e.to_string()))
    }
}

/// Per-recipient game state snapshot. `current_word` is filled in only for
/// the drawer's connection; everyone else sees the mask.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSync {
    pub phase: GamePhase,
    pub masked_word: String,
    pub time_left: u32,
    pub drawer_id: Option<PlayerId>,
    pub current_word: String,
}

/// Everything the server pushes to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "room_joined")]
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: String,
        player_id: PlayerId,
    },
    #[serde(rename = "error_message")]
    ErrorMessage(String),
    #[serde(rename = "word_options")]
    WordOptions(Vec<String>),
    #[serde(rename = "SYNC_STATE")]
    SyncState(StateSync),
    #[serde(rename = "SYNC_PLAYERS")]
    SyncPlayers(Vec<Player>),
    #[serde(rename = "SYNC_SETTINGS")]
    SyncSettings(GameSettings),
    #[serde(rename = "SYNC_GALLERY")]
    SyncGallery(Vec<GalleryItem>),
    #[serde(rename = "SYNC_DRAWING")]
    SyncDrawing(Vec<DrawEvent>),
    /// Relay of a player-authored event. Carries the author's id so
    /// receivers can drop their own echoes by identity rather than by
    /// event kind.
    #[serde(rename = "GAME_EVENT")]
    #[serde(rename_all = "camelCase")]
    Relay {
        sender_id: PlayerId,
        event: GameEvent,
    },
}

impl ServerEvent {
    pub fn to_ws_message(&self) -> Message {
        let json = serde_json::to_string(self).expect("server event serializes");
        Message::Text(json)
    }
}
