use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::drawing::{DrawEvent, DrawLog};
use crate::error::GameError;
use crate::game::settings::GameSettings;
use crate::game::words;
use crate::room::player::{Player, PlayerId};
use crate::websocket::message::{
    ChatMessage, GalleryItem, GameEvent, ServerEvent, StateSync, MAX_CHAT_LEN,
    MAX_GALLERY_IMAGE_LEN,
};

pub const MAX_PLAYERS: usize = 12;
pub const MAX_GALLERY_ITEMS: usize = 100;

pub const GUESS_BASE_POINTS: u32 = 100;
pub const GUESS_ORDER_BONUS: u32 = 50;
pub const GUESS_ORDER_STEP: u32 = 10;
pub const DRAWER_GUESS_BONUS: u32 = 50;

/// Scoreboard display time between rounds, and the shorter skip when the
/// drawer walks out mid-turn.
pub const NEXT_TURN_DELAY_SECS: u64 = 5;
pub const DRAWER_LEFT_DELAY_SECS: u64 = 2;

/// Sender id carried on server-authored relays (system chat, canvas
/// clears). Never collides with a real player id.
pub const SYSTEM_SENDER: PlayerId = Uuid::nil();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    WordSelect,
    Drawing,
    RoundOver,
    GameOver,
}

/// Why a round ended; shapes the system chat line.
#[derive(Debug, Clone)]
pub enum RoundEnd {
    Timeout,
    AllGuessed,
    DrawerLeft { name: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// The round timed out. Carries the post-transition epoch so the caller
    /// can schedule the next turn against it.
    RoundOver { epoch: u64 },
}

#[derive(Debug, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Correct guess; `round_over` carries the new epoch when this guess
    /// completed the round (everyone got it).
    Correct { round_over: Option<u64> },
    Incorrect,
    /// A word-revealing message from the drawer or a finished guesser.
    /// Dropped without any broadcast.
    Suppressed,
}

/// What a departure changed, so the connection handler can schedule
/// follow-ups (turn fast-forward, vacancy sweep) outside the room lock.
#[derive(Debug, Default)]
pub struct Departure {
    pub name: String,
    pub new_host: Option<String>,
    /// Epoch to schedule the fast-forwarded next turn against, set when the
    /// current drawer left mid-turn.
    pub drawer_left_epoch: Option<u64>,
    pub returned_to_lobby: bool,
    pub now_empty: bool,
    pub vacancy: u64,
}

/// One game room: the authoritative phase machine, scoreboard, hint state
/// and replay log. All methods are synchronous and must be called under the
/// room's mutex; autonomous work (ticks, delays) is scheduled by the caller
/// against the `epoch` token returned from transitions.
pub struct GameRoom {
    code: String,
    players: Vec<Player>,
    settings: GameSettings,
    phase: GamePhase,
    round: u32,
    word: String,
    revealed: HashSet<usize>,
    guessed: HashSet<PlayerId>,
    drawer_index: usize,
    time_left: u32,
    pending_words: Option<Vec<String>>,
    log: DrawLog,
    gallery: Vec<GalleryItem>,
    /// Bumped on every phase transition. A scheduled callback captured an
    /// older value and must do nothing when it no longer matches.
    epoch: u64,
    /// Bumped on every join. A pending empty-room deletion captured an
    /// older value and must not fire if the room was re-occupied since.
    vacancy: u64,
    /// Set when the drawer left mid-turn and the seat already points at the
    /// successor; the scheduled turn advance must not move it again.
    drawer_vacated: bool,
    /// The departed drawer was last in join order, so the skipped advance
    /// still wraps into a new round.
    vacated_wrapped: bool,
}

impl GameRoom {
    pub fn new(code: String) -> Self {
        Self {
            code,
            players: Vec::new(),
            settings: GameSettings::default(),
            phase: GamePhase::Lobby,
            round: 1,
            word: String::new(),
            revealed: HashSet::new(),
            guessed: HashSet::new(),
            drawer_index: 0,
            time_left: 0,
            pending_words: None,
            log: DrawLog::new(),
            gallery: Vec::new(),
            epoch: 0,
            vacancy: 0,
            drawer_vacated: false,
            vacated_wrapped: false,
        }
    }

    // --- Accessors ---

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn vacancy(&self) -> u64 {
        self.vacancy
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn drawer(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_drawer)
    }

    pub fn log_events(&self) -> &[DrawEvent] {
        self.log.events()
    }

    pub fn gallery(&self) -> &[GalleryItem] {
        &self.gallery
    }

    fn position(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn require_host(&self, id: PlayerId) -> Result<(), GameError> {
        match self.player(id) {
            Some(p) if p.is_host => Ok(()),
            Some(_) => Err(GameError::NotHost),
            None => Err(GameError::NotInRoom),
        }
    }

    fn require_drawer(&self, id: PlayerId) -> Result<(), GameError> {
        match self.player(id) {
            Some(p) if p.is_drawer => Ok(()),
            Some(_) => Err(GameError::NotDrawer),
            None => Err(GameError::NotInRoom),
        }
    }

    // --- Membership ---

    pub fn add_player(&mut self, player: Player) -> Result<PlayerId, GameError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull(MAX_PLAYERS));
        }
        // Any join invalidates a pending empty-room deletion.
        self.vacancy += 1;
        let id = player.id;
        self.players.push(player);
        Ok(id)
    }

    /// Remove a player and repair everything their seat was holding up:
    /// host role, drawer seat, and the room itself when nobody is left.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Departure> {
        let idx = self.position(id)?;
        let was_last_seat = idx == self.players.len() - 1;
        let removed = self.players.remove(idx);
        self.guessed.remove(&removed.id);

        // Keep the rotation cursor on the same seat, wrapping if the tail
        // was removed.
        if idx < self.drawer_index {
            self.drawer_index -= 1;
        }
        if self.drawer_index >= self.players.len() {
            self.drawer_index = 0;
        }

        let mut departure = Departure {
            name: removed.name.clone(),
            ..Departure::default()
        };

        if self.players.is_empty() {
            self.epoch += 1;
            departure.now_empty = true;
            departure.vacancy = self.vacancy;
            return Some(departure);
        }

        if removed.is_host {
            self.players[0].is_host = true;
            let name = self.players[0].name.clone();
            self.system_chat(format!("{name} is now the host"));
            departure.new_host = Some(name);
        }

        self.system_chat(format!("{} left the game", removed.name));

        let in_game = !matches!(self.phase, GamePhase::Lobby | GamePhase::GameOver);

        if in_game && self.players.len() == 1 {
            self.reset_to_lobby();
            self.system_chat("Not enough players, back to the lobby".to_string());
            departure.returned_to_lobby = true;
            self.broadcast_state();
            return Some(departure);
        }

        if removed.is_drawer && in_game {
            // The cursor already points at the next player in join order;
            // hand them the seat now and tell the scheduled advance to
            // stay put.
            self.drawer_vacated = true;
            self.vacated_wrapped = self.vacated_wrapped || was_last_seat;
            if let Some(next) = self.players.get_mut(self.drawer_index) {
                next.is_drawer = true;
            }
            if self.phase != GamePhase::RoundOver {
                self.log.clear();
                let epoch = self.end_round(RoundEnd::DrawerLeft {
                    name: removed.name.clone(),
                });
                departure.drawer_left_epoch = Some(epoch);
            }
        }

        self.broadcast_state();
        Some(departure)
    }

    // --- Broadcast primitives ---

    pub fn broadcast(&self, event: &ServerEvent) {
        let msg = event.to_ws_message();
        for p in &self.players {
            p.send(msg.clone());
        }
    }

    pub fn send_to(&self, id: PlayerId, event: &ServerEvent) {
        if let Some(p) = self.player(id) {
            p.send(event.to_ws_message());
        }
    }

    /// Relay a player-authored event, tagged with its author so receivers
    /// can drop their own echoes. Draw traffic skips the author; chat and
    /// reactions echo back so the sender's UI stays uniform.
    fn relay_from(&self, sender: PlayerId, event: GameEvent, echo: bool) {
        let msg = ServerEvent::Relay {
            sender_id: sender,
            event,
        }
        .to_ws_message();
        for p in &self.players {
            if echo || p.id != sender {
                p.send(msg.clone());
            }
        }
    }

    pub fn system_chat(&self, text: String) {
        self.relay_from(
            SYSTEM_SENDER,
            GameEvent::ChatMessage(ChatMessage::system(text)),
            true,
        );
    }

    /// Per-recipient state view. The secret word travels only to the
    /// drawer's connection.
    pub fn state_for(&self, viewer: PlayerId) -> StateSync {
        let drawer = self.drawer();
        StateSync {
            phase: self.phase,
            masked_word: self.masked_word(),
            time_left: self.time_left,
            drawer_id: drawer.map(|d| d.id),
            current_word: match drawer {
                Some(d) if d.id == viewer => self.word.clone(),
                _ => String::new(),
            },
        }
    }

    pub fn broadcast_state(&self) {
        for p in &self.players {
            p.send(ServerEvent::SyncState(self.state_for(p.id)).to_ws_message());
        }
        self.broadcast(&ServerEvent::SyncPlayers(self.players.clone()));
    }

    // --- Settings ---

    pub fn update_settings(
        &mut self,
        requester: PlayerId,
        settings: GameSettings,
    ) -> Result<(), GameError> {
        self.require_host(requester)?;
        self.settings = settings.sanitized();
        self.broadcast(&ServerEvent::SyncSettings(self.settings.clone()));
        Ok(())
    }

    // --- Phase machine ---

    pub fn start_game(&mut self, requester: PlayerId) -> Result<(), GameError> {
        self.require_host(requester)?;
        if self.phase != GamePhase::Lobby {
            return Err(GameError::WrongPhase);
        }
        if self.players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        for p in &mut self.players {
            p.score = 0;
            p.is_drawer = false;
        }
        self.players[0].is_drawer = true;
        self.drawer_index = 0;
        self.round = 1;
        self.gallery.clear();
        self.clear_turn_state();
        self.drawer_vacated = false;
        self.vacated_wrapped = false;
        self.phase = GamePhase::WordSelect;
        self.epoch += 1;

        self.broadcast(&ServerEvent::SyncGallery(self.gallery.clone()));
        self.broadcast_state();
        Ok(())
    }

    /// Offer the drawer their three candidates and remember the set so the
    /// eventual selection can be validated against it.
    pub fn word_options<R: Rng>(
        &mut self,
        requester: PlayerId,
        rng: &mut R,
    ) -> Result<Vec<String>, GameError> {
        if self.phase != GamePhase::WordSelect {
            return Err(GameError::WrongPhase);
        }
        self.require_drawer(requester)?;
        let options = words::word_options(&self.settings, rng);
        self.pending_words = Some(options.clone());
        Ok(options)
    }

    /// Accept the drawer's pick, arm the round and return the epoch the
    /// caller must run the 1s ticker against.
    pub fn select_word(&mut self, requester: PlayerId, word: &str) -> Result<u64, GameError> {
        if self.phase != GamePhase::WordSelect {
            return Err(GameError::WrongPhase);
        }
        self.require_drawer(requester)?;
        match &self.pending_words {
            Some(options) if options.iter().any(|w| w == word) => {}
            _ => return Err(GameError::WordNotOffered),
        }

        self.word = word.to_string();
        self.pending_words = None;
        self.revealed.clear();
        self.guessed.clear();
        self.time_left = self.settings.draw_time;
        self.log.clear();
        self.phase = GamePhase::Drawing;
        self.epoch += 1;

        self.relay_from(SYSTEM_SENDER, GameEvent::ClearCanvas, true);
        self.broadcast_state();
        Ok(self.epoch)
    }

    /// One second of round time. Reveals hints at the half and quarter
    /// marks and ends the round at zero.
    pub fn tick<R: Rng>(&mut self, rng: &mut R) -> TickOutcome {
        if self.phase != GamePhase::Drawing {
            return TickOutcome::Running;
        }
        self.time_left = self.time_left.saturating_sub(1);

        let half = self.settings.draw_time / 2;
        let quarter = self.settings.draw_time / 4;
        if self.time_left == half || self.time_left == quarter {
            self.reveal_random_hint(rng);
        }

        if self.time_left == 0 {
            let epoch = self.end_round(RoundEnd::Timeout);
            return TickOutcome::RoundOver { epoch };
        }

        self.broadcast_state();
        TickOutcome::Running
    }

    /// Uncover one random unrevealed, non-space character.
    pub fn reveal_random_hint<R: Rng>(&mut self, rng: &mut R) {
        let unrevealed: Vec<usize> = self
            .word
            .chars()
            .enumerate()
            .filter(|(i, c)| *c != ' ' && !self.revealed.contains(i))
            .map(|(i, _)| i)
            .collect();
        if !unrevealed.is_empty() {
            let idx = unrevealed[rng.gen_range(0..unrevealed.len())];
            self.revealed.insert(idx);
        }
    }

    /// The word as non-drawers see it: revealed characters and spaces
    /// shown, everything else an underscore.
    pub fn masked_word(&self) -> String {
        self.word
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if c == ' ' || self.revealed.contains(&i) {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Evaluate one guess. Correct guesses score by remaining time plus a
    /// decreasing order bonus and pay the drawer a flat cut; the word
    /// itself never appears in any broadcast.
    pub fn submit_guess(
        &mut self,
        sender: PlayerId,
        text: &str,
    ) -> Result<GuessOutcome, GameError> {
        let idx = self.position(sender).ok_or(GameError::NotInRoom)?;
        if self.phase != GamePhase::Drawing {
            return Err(GameError::WrongPhase);
        }

        let guess = text.trim();
        let correct = !self.word.is_empty()
            && guess.to_lowercase() == self.word.trim().to_lowercase();
        let is_drawer = self.players[idx].is_drawer;
        let already_guessed = self.guessed.contains(&sender);

        if is_drawer || already_guessed {
            if correct {
                return Ok(GuessOutcome::Suppressed);
            }
            self.relay_chat(idx, guess);
            return Ok(GuessOutcome::Incorrect);
        }

        if !correct {
            self.relay_chat(idx, guess);
            return Ok(GuessOutcome::Incorrect);
        }

        self.guessed.insert(sender);
        let order = self.guessed.len() as u32;
        let order_bonus =
            GUESS_ORDER_BONUS.saturating_sub(GUESS_ORDER_STEP * (order - 1));
        let points = GUESS_BASE_POINTS + 2 * self.time_left + order_bonus;

        let name = {
            let player = &mut self.players[idx];
            player.score += points;
            player.name.clone()
        };
        if let Some(drawer) = self.players.iter_mut().find(|p| p.is_drawer) {
            drawer.score += DRAWER_GUESS_BONUS;
        }

        let mut msg = ChatMessage::system(format!("{name} guessed the word! 🎉"));
        msg.is_correct = true;
        self.relay_from(SYSTEM_SENDER, GameEvent::ChatMessage(msg), true);
        self.broadcast_state();

        let everyone_guessed = self
            .players
            .iter()
            .filter(|p| !p.is_drawer)
            .all(|p| self.guessed.contains(&p.id));
        if everyone_guessed {
            let epoch = self.end_round(RoundEnd::AllGuessed);
            return Ok(GuessOutcome::Correct {
                round_over: Some(epoch),
            });
        }
        Ok(GuessOutcome::Correct { round_over: None })
    }

    fn relay_chat(&self, idx: usize, text: &str) {
        let clean: String = ammonia::clean(text).chars().take(MAX_CHAT_LEN).collect();
        if clean.is_empty() {
            return;
        }
        let player = &self.players[idx];
        let msg = ChatMessage::from_player(player, clean);
        self.relay_from(player.id, GameEvent::ChatMessage(msg), true);
    }

    /// Close the current round: cancel the ticker via the epoch, announce
    /// the outcome and move to the scoreboard phase. Returns the epoch the
    /// caller schedules the next turn against.
    pub fn end_round(&mut self, reason: RoundEnd) -> u64 {
        self.phase = GamePhase::RoundOver;
        self.time_left = 0;
        self.epoch += 1;

        let text = match reason {
            RoundEnd::AllGuessed => {
                format!("Everyone guessed it! The word was {}", self.word)
            }
            RoundEnd::Timeout => {
                let guessers = self.guessed.len();
                if guessers == 0 {
                    format!("Time's up! The word was {}", self.word)
                } else {
                    format!(
                        "Time's up! {guessers} guessed it. The word was {}",
                        self.word
                    )
                }
            }
            RoundEnd::DrawerLeft { name } => {
                format!("{name} left the game. Skipping their turn...")
            }
        };
        self.system_chat(text);
        self.broadcast_state();
        self.epoch
    }

    /// Hand the pencil to the next player in join order, rolling the round
    /// counter on wrap and finishing the game past the configured rounds.
    pub fn next_turn(&mut self) {
        if self.players.is_empty() || self.phase != GamePhase::RoundOver {
            return;
        }

        let wrapped = if self.drawer_vacated {
            // The departed drawer's successor already holds the seat.
            self.drawer_vacated = false;
            std::mem::take(&mut self.vacated_wrapped)
        } else {
            let wrapped = self.drawer_index + 1 >= self.players.len();
            if let Some(current) = self.players.get_mut(self.drawer_index) {
                current.is_drawer = false;
            }
            self.drawer_index = (self.drawer_index + 1) % self.players.len();
            wrapped
        };

        if wrapped {
            self.round += 1;
            if self.round > self.settings.rounds {
                for p in &mut self.players {
                    p.is_drawer = false;
                }
                self.phase = GamePhase::GameOver;
                self.epoch += 1;
                self.broadcast_state();
                return;
            }
        }

        self.players[self.drawer_index].is_drawer = true;
        self.clear_turn_state();
        self.phase = GamePhase::WordSelect;
        self.epoch += 1;

        self.relay_from(SYSTEM_SENDER, GameEvent::ClearCanvas, true);
        self.broadcast_state();
    }

    /// Host acknowledges the podium and reopens the lobby. Scores stay on
    /// the board until the next game starts.
    pub fn play_again(&mut self, requester: PlayerId) -> Result<(), GameError> {
        self.require_host(requester)?;
        if self.phase != GamePhase::GameOver {
            return Err(GameError::WrongPhase);
        }
        self.reset_to_lobby();
        self.broadcast_state();
        Ok(())
    }

    fn reset_to_lobby(&mut self) {
        for p in &mut self.players {
            p.is_drawer = false;
        }
        self.drawer_index = 0;
        self.round = 1;
        self.drawer_vacated = false;
        self.vacated_wrapped = false;
        self.clear_turn_state();
        self.phase = GamePhase::Lobby;
        self.epoch += 1;
    }

    fn clear_turn_state(&mut self) {
        self.word.clear();
        self.revealed.clear();
        self.guessed.clear();
        self.pending_words = None;
        self.time_left = 0;
        self.log.clear();
    }

    // --- In-game events ---

    /// Route one rate-limited game event: canvas traffic is drawer-only
    /// and feeds the replay log, chat and reactions are social, gallery
    /// items accumulate for the end-of-game wall.
    pub fn apply_event(&mut self, sender: PlayerId, event: GameEvent) -> Result<(), GameError> {
        let idx = self.position(sender).ok_or(GameError::NotInRoom)?;
        match event {
            GameEvent::DrawPoint(_)
            | GameEvent::EndStroke
            | GameEvent::FillCanvas(_)
            | GameEvent::UndoAction
            | GameEvent::ClearCanvas => {
                if self.phase != GamePhase::Drawing {
                    return Err(GameError::WrongPhase);
                }
                if !self.players[idx].is_drawer {
                    return Err(GameError::NotDrawer);
                }
                if let Some(op) = event.as_draw_event() {
                    self.log.record(&op);
                }
                self.relay_from(sender, event, false);
            }
            GameEvent::ChatMessage(msg) => {
                // Client-supplied sender fields are ignored; identity comes
                // from the session binding.
                self.relay_chat(idx, &msg.text);
            }
            GameEvent::EmojiReaction { emoji } => {
                let emoji: String = emoji.chars().take(8).collect();
                self.relay_from(sender, GameEvent::EmojiReaction { emoji }, true);
            }
            GameEvent::AddGalleryItem(item) => {
                self.add_gallery_item(idx, item)?;
            }
        }
        Ok(())
    }

    fn add_gallery_item(&mut self, idx: usize, mut item: GalleryItem) -> Result<(), GameError> {
        if item.image.len() > MAX_GALLERY_IMAGE_LEN || !item.image.starts_with("data:image/") {
            return Err(GameError::Protocol("bad gallery image".to_string()));
        }
        if self.gallery.len() >= MAX_GALLERY_ITEMS {
            return Ok(());
        }
        let player = &self.players[idx];
        item.drawer = player.name.clone();
        item.drawer_avatar = Some(player.avatar.clone());
        item.word = ammonia::clean(&item.word);
        self.gallery.push(item);
        self.broadcast(&ServerEvent::SyncGallery(self.gallery.clone()));
        Ok(())
    }
}
