use crate::drawing::event::DrawEvent;

/// Hard cap on replayable events per turn. Live broadcast is unaffected
/// once the cap is reached; late joiners just see a truncated history.
pub const MAX_LOG_EVENTS: usize = 5000;

/// Append-only, bounded record of the current turn's canvas operations,
/// replayed to connections that join while drawing is in progress.
#[derive(Debug, Default)]
pub struct DrawLog {
    events: Vec<DrawEvent>,
}

impl DrawLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event. A `Clear` resets the log; anything else is
    /// appended until the cap, then silently dropped.
    pub fn record(&mut self, event: &DrawEvent) {
        if matches!(event, DrawEvent::Clear) {
            self.events.clear();
            return;
        }
        if self.events.len() < MAX_LOG_EVENTS {
            self.events.push(event.clone());
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[DrawEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
