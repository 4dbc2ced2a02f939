pub mod canvas;
pub mod event;
pub mod log;

pub use canvas::{CanvasReplica, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use event::{DrawEvent, FillAction, StrokePoint};
pub use log::{DrawLog, MAX_LOG_EVENTS};
