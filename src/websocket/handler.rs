use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::error::GameError;
use crate::game::room::{GamePhase, GuessOutcome, DRAWER_LEFT_DELAY_SECS, NEXT_TURN_DELAY_SECS};
use crate::game::timer;
use crate::room::player::{validate_name, Player, PlayerId, MAX_AVATAR_LEN, MAX_CUSTOM_AVATAR_LEN};
use crate::room::registry::RoomHandle;
use crate::websocket::message::{ClientIntent, ServerEvent};
use crate::websocket::rate_limit::{RateLimiter, RateVerdict};
use crate::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection: pump outgoing messages from the session's channel,
/// feed incoming text through the rate gate and intent dispatch, and
/// recover room state when the socket goes away.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let mut session = Session::new(state, tx);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                session.handle_text(&text).await;
            }
            Ok(Message::Close(_)) => {
                break;
            }
            Ok(_) => {
                // Ignore binary, ping and pong frames.
            }
            Err(e) => {
                tracing::warn!("websocket error: {e}");
                break;
            }
        }
    }

    session.disconnect().await;
    send_task.abort();
}

/// The binding of one connection to its seat in a room.
struct Binding {
    code: String,
    room: RoomHandle,
    player_id: PlayerId,
}

/// Per-connection state: the outbound channel, the optional room binding
/// and the rate gate every inbound intent passes through.
struct Session {
    state: AppState,
    tx: UnboundedSender<Message>,
    binding: Option<Binding>,
    limiter: RateLimiter,
}

impl Session {
    fn new(state: AppState, tx: UnboundedSender<Message>) -> Self {
        Self {
            state,
            tx,
            binding: None,
            limiter: RateLimiter::default(),
        }
    }

    async fn handle_text(&mut self, text: &str) {
        match self.limiter.check() {
            RateVerdict::Allowed => {}
            RateVerdict::DroppedWithWarning => {
                self.send_event(&ServerEvent::ErrorMessage(
                    "Slow down! Too many actions.".to_string(),
                ));
                return;
            }
            RateVerdict::Dropped => return,
        }

        let intent = match ClientIntent::parse(text) {
            Ok(intent) => intent,
            Err(e) => {
                self.send_event(&ServerEvent::ErrorMessage(e.to_string()));
                return;
            }
        };

        if let Err(e) = self.dispatch(intent).await {
            self.send_event(&ServerEvent::ErrorMessage(e.to_string()));
        }
    }

    async fn dispatch(&mut self, intent: ClientIntent) -> Result<(), GameError> {
        match intent {
            ClientIntent::CreateRoom {
                name,
                avatar,
                custom_avatar,
            } => self.create_room(name, avatar, custom_avatar).await,
            ClientIntent::JoinRoom {
                room_id,
                name,
                avatar,
                custom_avatar,
            } => self.join_room(room_id, name, avatar, custom_avatar).await,
            ClientIntent::UpdateSettings(settings) => {
                let binding = self.binding()?;
                let mut room = binding.room.lock().await;
                room.update_settings(binding.player_id, settings)
            }
            ClientIntent::StartGame => {
                let binding = self.binding()?;
                let mut room = binding.room.lock().await;
                room.start_game(binding.player_id)
            }
            ClientIntent::GetWords => {
                let binding = self.binding()?;
                let mut room = binding.room.lock().await;
                let words = room.word_options(binding.player_id, &mut rand::thread_rng())?;
                room.send_to(binding.player_id, &ServerEvent::WordOptions(words));
                Ok(())
            }
            ClientIntent::SelectWord(word) => {
                let binding = self.binding()?;
                let epoch = {
                    let mut room = binding.room.lock().await;
                    room.select_word(binding.player_id, &word)?
                };
                timer::spawn_round_timer(binding.room.clone(), epoch);
                Ok(())
            }
            ClientIntent::SubmitGuess { text } => {
                let binding = self.binding()?;
                let outcome = {
                    let mut room = binding.room.lock().await;
                    room.submit_guess(binding.player_id, &text)?
                };
                if let GuessOutcome::Correct {
                    round_over: Some(epoch),
                } = outcome
                {
                    timer::schedule_next_turn(
                        binding.room.clone(),
                        epoch,
                        NEXT_TURN_DELAY_SECS,
                    );
                }
                Ok(())
            }
            ClientIntent::PlayAgain => {
                let binding = self.binding()?;
                let mut room = binding.room.lock().await;
                room.play_again(binding.player_id)
            }
            ClientIntent::GameEvent(event) => {
                let binding = self.binding()?;
                let mut room = binding.room.lock().await;
                room.apply_event(binding.player_id, event)
            }
        }
    }

    async fn create_room(
        &mut self,
        name: String,
        avatar: String,
        custom_avatar: Option<String>,
    ) -> Result<(), GameError> {
        self.require_unbound()?;
        let (name, avatar, custom_avatar) = sanitize_profile(&name, &avatar, custom_avatar)?;

        let (code, room) = self.state.registry.create().await;
        let player_id = {
            let mut guard = room.lock().await;
            let player = Player::new(name, avatar, custom_avatar, true, self.tx.clone());
            let player_id = guard.add_player(player)?;
            guard.send_to(
                player_id,
                &ServerEvent::RoomJoined {
                    room_id: code.clone(),
                    player_id,
                },
            );
            guard.broadcast_state();
            guard.broadcast(&ServerEvent::SyncSettings(guard.settings().clone()));
            player_id
        };

        tracing::info!(room = %code, "room created");
        self.binding = Some(Binding {
            code,
            room,
            player_id,
        });
        Ok(())
    }

    async fn join_room(
        &mut self,
        code: String,
        name: String,
        avatar: String,
        custom_avatar: Option<String>,
    ) -> Result<(), GameError> {
        self.require_unbound()?;
        let (name, avatar, custom_avatar) = sanitize_profile(&name, &avatar, custom_avatar)?;

        let code = code.trim().to_uppercase();
        let room = self
            .state
            .registry
            .get(&code)
            .await
            .ok_or(GameError::RoomNotFound)?;

        let player_id = {
            let mut guard = room.lock().await;
            let display_name = name.clone();
            let player = Player::new(name, avatar, custom_avatar, false, self.tx.clone());
            // A join during the empty-room grace period lands here too and
            // bumps the vacancy token, cancelling the pending deletion.
            let player_id = guard.add_player(player)?;

            guard.send_to(
                player_id,
                &ServerEvent::RoomJoined {
                    room_id: code.clone(),
                    player_id,
                },
            );
            guard.broadcast_state();
            guard.broadcast(&ServerEvent::SyncSettings(guard.settings().clone()));

            // Late joiners get the accumulated gallery and, mid-turn, the
            // replay log before any live event can reach them.
            if !guard.gallery().is_empty() {
                guard.send_to(player_id, &ServerEvent::SyncGallery(guard.gallery().to_vec()));
            }
            if guard.phase() == GamePhase::Drawing && !guard.log_events().is_empty() {
                guard.send_to(
                    player_id,
                    &ServerEvent::SyncDrawing(guard.log_events().to_vec()),
                );
            }

            guard.system_chat(format!("{display_name} joined the game"));
            player_id
        };

        tracing::info!(room = %code, "player joined");
        self.binding = Some(Binding {
            code,
            room,
            player_id,
        });
        Ok(())
    }

    /// Tear down this connection's seat and schedule whatever the
    /// departure left behind: a fast-forwarded turn, or the empty-room
    /// grace deletion.
    async fn disconnect(&mut self) {
        let Some(binding) = self.binding.take() else {
            return;
        };

        let departure = {
            let mut room = binding.room.lock().await;
            room.remove_player(binding.player_id)
        };
        let Some(departure) = departure else {
            return;
        };

        tracing::info!(room = %binding.code, player = %departure.name, "player disconnected");

        if let Some(epoch) = departure.drawer_left_epoch {
            timer::schedule_next_turn(binding.room.clone(), epoch, DRAWER_LEFT_DELAY_SECS);
        }
        if departure.now_empty {
            self.state.registry.schedule_vacancy_sweep(
                binding.code,
                binding.room,
                departure.vacancy,
            );
        }
    }

    fn binding(&self) -> Result<&Binding, GameError> {
        self.binding.as_ref().ok_or(GameError::NotInRoom)
    }

    fn require_unbound(&self) -> Result<(), GameError> {
        if self.binding.is_some() {
            return Err(GameError::Protocol("already in a room".to_string()));
        }
        Ok(())
    }

    fn send_event(&self, event: &ServerEvent) {
        let _ = self.tx.send(event.to_ws_message());
    }
}

/// Validate and clean the identity fields a player presents on entry.
fn sanitize_profile(
    name: &str,
    avatar: &str,
    custom_avatar: Option<String>,
) -> Result<(String, String, Option<String>), GameError> {
    if !validate_name(name) {
        return Err(GameError::InvalidName);
    }
    let name: String = ammonia::clean(name.trim()).chars().take(20).collect();
    if name.is_empty() {
        return Err(GameError::InvalidName);
    }
    let avatar: String = avatar.chars().take(MAX_AVATAR_LEN).collect();
    let custom_avatar = custom_avatar
        .filter(|c| c.starts_with("data:image/") && c.len() <= MAX_CUSTOM_AVATAR_LEN);
    Ok((name, avatar, custom_avatar))
}
