pub mod player;
pub mod registry;

pub use player::{Player, PlayerId};
pub use registry::{RoomHandle, RoomRegistry};
