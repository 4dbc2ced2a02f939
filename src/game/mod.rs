pub mod room;
pub mod settings;
pub mod timer;
pub mod words;

pub use room::{GamePhase, GameRoom};
pub use settings::{Difficulty, GameSettings};
