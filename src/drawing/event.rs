use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// One point of a pen or eraser stroke, in the fixed logical canvas
/// resolution shared by every client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokePoint {
    pub x: f32,
    pub y: f32,
    /// `#rrggbb` color string as sent by clients.
    pub color: String,
    pub width: f32,
    pub is_eraser: bool,
    /// True when this point begins a new stroke.
    pub is_starting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillAction {
    pub x: f32,
    pub y: f32,
    pub color: String,
}

/// Canvas operations, in the order they are applied. This is the unit the
/// per-room replay log stores and the replicator consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DrawEvent {
    #[serde(rename = "DRAW_POINT")]
    Stroke(StrokePoint),
    #[serde(rename = "END_STROKE")]
    StrokeEnd,
    #[serde(rename = "FILL_CANVAS")]
    Fill(FillAction),
    #[serde(rename = "CLEAR_CANVAS")]
    Clear,
}

/// Parse a `#rrggbb` (or `rrggbb`) color string into RGB bytes.
pub fn parse_hex_color(s: &str) -> Result<(u8, u8, u8), GameError> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(GameError::Protocol(format!("bad color: {s}")));
    }
    let parse = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .map_err(|_| GameError::Protocol(format!("bad color: {s}")))
    };
    Ok((parse(0..2)?, parse(2..4)?, parse(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0080").unwrap(), (255, 0, 128));
        assert_eq!(parse_hex_color("000000").unwrap(), (0, 0, 0));
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn test_draw_event_wire_format() {
        let event = DrawEvent::Stroke(StrokePoint {
            x: 10.0,
            y: 20.0,
            color: "#000000".to_string(),
            width: 5.0,
            is_eraser: false,
            is_starting: true,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"DRAW_POINT""#));
        assert!(json.contains(r#""isStarting":true"#));

        let back: DrawEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_unit_variants_parse_without_payload() {
        let end: DrawEvent = serde_json::from_str(r#"{"type":"END_STROKE"}"#).unwrap();
        assert_eq!(end, DrawEvent::StrokeEnd);
        let clear: DrawEvent = serde_json::from_str(r#"{"type":"CLEAR_CANVAS"}"#).unwrap();
        assert_eq!(clear, DrawEvent::Clear);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let result: Result<DrawEvent, _> =
            serde_json::from_str(r#"{"type":"SPRAY_CAN","payload":{}}"#);
        assert!(result.is_err());
    }
}
