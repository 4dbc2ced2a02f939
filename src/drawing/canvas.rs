use image::{ImageBuffer, ImageFormat, Rgba};
use std::io::Cursor;
use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::drawing::event::{parse_hex_color, DrawEvent, FillAction, StrokePoint};
use crate::error::GameError;

/// Fixed logical resolution. Every client normalizes pointer coordinates to
/// this raster before transmission, so fills and strokes land on the same
/// pixels for all participants.
pub const CANVAS_WIDTH: u32 = 1600;
pub const CANVAS_HEIGHT: u32 = 900;

const BACKGROUND: Color = Color::WHITE;

/// One undoable unit: a finished stroke or a single fill.
#[derive(Debug, Clone)]
enum HistoryItem {
    Stroke(Vec<StrokePoint>),
    Fill(FillAction),
}

/// Client-side canvas reconstruction. Consumes the server's draw-event
/// stream (live or replayed), keeps an append-only history for undo, and
/// owns the flood-fill raster operation.
pub struct CanvasReplica {
    pixmap: Pixmap,
    history: Vec<HistoryItem>,
    live_stroke: Vec<StrokePoint>,
}

impl Default for CanvasReplica {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasReplica {
    pub fn new() -> Self {
        let mut pixmap =
            Pixmap::new(CANVAS_WIDTH, CANVAS_HEIGHT).expect("fixed-size pixmap");
        pixmap.fill(BACKGROUND);
        Self {
            pixmap,
            history: Vec::new(),
            live_stroke: Vec::new(),
        }
    }

    /// Apply one event in stream order.
    pub fn apply(&mut self, event: &DrawEvent) -> Result<(), GameError> {
        match event {
            DrawEvent::Stroke(point) => {
                if point.is_starting {
                    self.commit_live_stroke();
                    self.live_stroke.clear();
                }
                self.live_stroke.push(point.clone());
                let len = self.live_stroke.len();
                let prev = if len > 1 {
                    Some(self.live_stroke[len - 2].clone())
                } else {
                    None
                };
                self.paint_segment(prev.as_ref(), point)?;
            }
            DrawEvent::StrokeEnd => self.commit_live_stroke(),
            DrawEvent::Fill(fill) => {
                self.flood_fill(fill.x, fill.y, &fill.color)?;
                self.history.push(HistoryItem::Fill(fill.clone()));
            }
            DrawEvent::Clear => self.clear(),
        }
        Ok(())
    }

    /// Replay a log slice in order, e.g. the late-join `SYNC_DRAWING`
    /// payload.
    pub fn replay(&mut self, events: &[DrawEvent]) -> Result<(), GameError> {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    /// Pop the most recent history item and repaint everything else from a
    /// blank canvas. An in-progress stroke is discarded.
    pub fn undo(&mut self) -> Result<(), GameError> {
        self.live_stroke.clear();
        self.history.pop();
        self.repaint()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.live_stroke.clear();
        self.pixmap.fill(BACKGROUND);
    }

    fn commit_live_stroke(&mut self) {
        if !self.live_stroke.is_empty() {
            let stroke = std::mem::take(&mut self.live_stroke);
            self.history.push(HistoryItem::Stroke(stroke));
        }
    }

    fn repaint(&mut self) -> Result<(), GameError> {
        self.pixmap.fill(BACKGROUND);
        let items = self.history.clone();
        for item in &items {
            match item {
                HistoryItem::Stroke(points) => {
                    for (i, point) in points.iter().enumerate() {
                        let prev = if i > 0 { Some(&points[i - 1]) } else { None };
                        self.paint_segment(prev, point)?;
                    }
                }
                HistoryItem::Fill(fill) => self.flood_fill(fill.x, fill.y, &fill.color)?,
            }
        }
        Ok(())
    }

    /// Stroke one segment (or a dot for a stroke's first point). The eraser
    /// paints background color, which is equivalent to erasing against the
    /// opaque white canvas.
    fn paint_segment(
        &mut self,
        prev: Option<&StrokePoint>,
        point: &StrokePoint,
    ) -> Result<(), GameError> {
        let mut paint = Paint::default();
        if point.is_eraser {
            paint.set_color(BACKGROUND);
        } else {
            let (r, g, b) = parse_hex_color(&point.color)?;
            paint.set_color_rgba8(r, g, b, 255);
        }
        paint.anti_alias = true;

        let stroke = Stroke {
            width: point.width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };

        let mut pb = PathBuilder::new();
        match prev {
            Some(p) => {
                pb.move_to(p.x, p.y);
                pb.line_to(point.x, point.y);
            }
            None => {
                pb.move_to(point.x, point.y);
                pb.line_to(point.x + 0.1, point.y);
            }
        }

        if let Some(path) = pb.finish() {
            self.pixmap
                .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
        Ok(())
    }

    /// 4-connected stack-based scanline fill. Compares exact RGBA against
    /// the seed pixel; a seed that already matches the fill color is a
    /// no-op.
    pub fn flood_fill(&mut self, x: f32, y: f32, color: &str) -> Result<(), GameError> {
        let (r, g, b) = parse_hex_color(color)?;
        let fill = [r, g, b, 255];

        let width = CANVAS_WIDTH as i32;
        let height = CANVAS_HEIGHT as i32;
        let sx = x as i32;
        let sy = y as i32;
        if sx < 0 || sx >= width || sy < 0 || sy >= height {
            return Ok(());
        }

        let data = self.pixmap.data_mut();
        let idx = |x: i32, y: i32| ((y * width + x) * 4) as usize;

        let seed = idx(sx, sy);
        let target: [u8; 4] = data[seed..seed + 4].try_into().expect("4-byte pixel");
        if target == fill {
            return Ok(());
        }

        let matches = |data: &[u8], x: i32, y: i32| {
            let i = idx(x, y);
            data[i..i + 4] == target
        };

        let mut stack = vec![(sx, sy)];
        while let Some((x, y)) = stack.pop() {
            if !matches(data, x, y) {
                continue;
            }

            // Walk to the left edge of this run.
            let mut x0 = x;
            while x0 > 0 && matches(data, x0 - 1, y) {
                x0 -= 1;
            }

            // Fill the run, seeding the rows above and below once per span.
            let mut above = false;
            let mut below = false;
            let mut xi = x0;
            while xi < width && matches(data, xi, y) {
                let i = idx(xi, y);
                data[i..i + 4].copy_from_slice(&fill);

                if y > 0 {
                    let hit = matches(data, xi, y - 1);
                    if hit && !above {
                        stack.push((xi, y - 1));
                    }
                    above = hit;
                }
                if y < height - 1 {
                    let hit = matches(data, xi, y + 1);
                    if hit && !below {
                        stack.push((xi, y + 1));
                    }
                    below = hit;
                }
                xi += 1;
            }
        }
        Ok(())
    }

    /// RGB of one pixel, unpremultiplied.
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let i = ((y * CANVAS_WIDTH + x) * 4) as usize;
        let data = self.pixmap.data();
        let a = data[i + 3] as f32 / 255.0;
        if a > 0.0 {
            (
                (data[i] as f32 / a).min(255.0) as u8,
                (data[i + 1] as f32 / a).min(255.0) as u8,
                (data[i + 2] as f32 / a).min(255.0) as u8,
            )
        } else {
            (255, 255, 255)
        }
    }

    pub fn raster(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Export the current raster as PNG bytes.
    pub fn to_png(&self) -> Vec<u8> {
        let data = self.pixmap.data();
        let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::new(CANVAS_WIDTH, CANVAS_HEIGHT);

        for (i, pixel) in img.pixels_mut().enumerate() {
            let offset = i * 4;
            // tiny-skia stores premultiplied RGBA, unpremultiply on export
            let a = data[offset + 3] as f32 / 255.0;
            if a > 0.0 {
                *pixel = Rgba([
                    (data[offset] as f32 / a).min(255.0) as u8,
                    (data[offset + 1] as f32 / a).min(255.0) as u8,
                    (data[offset + 2] as f32 / a).min(255.0) as u8,
                    data[offset + 3],
                ]);
            } else {
                *pixel = Rgba([255, 255, 255, 255]);
            }
        }

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png)
            .expect("PNG encode of in-memory raster");
        buffer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32, color: &str, starting: bool) -> DrawEvent {
        DrawEvent::Stroke(StrokePoint {
            x,
            y,
            color: color.to_string(),
            width: 6.0,
            is_eraser: false,
            is_starting: starting,
        })
    }

    #[test]
    fn test_new_canvas_is_white() {
        let canvas = CanvasReplica::new();
        assert_eq!(canvas.pixel(0, 0), (255, 255, 255));
        assert_eq!(canvas.pixel(800, 450), (255, 255, 255));
    }

    #[test]
    fn test_stroke_paints_pixels() {
        let mut canvas = CanvasReplica::new();
        canvas.apply(&point(100.0, 100.0, "#000000", true)).unwrap();
        canvas.apply(&point(200.0, 100.0, "#000000", false)).unwrap();
        assert_eq!(canvas.pixel(150, 100), (0, 0, 0));
    }

    #[test]
    fn test_eraser_restores_background() {
        let mut canvas = CanvasReplica::new();
        canvas.apply(&point(100.0, 100.0, "#ff0000", true)).unwrap();
        canvas.apply(&point(200.0, 100.0, "#ff0000", false)).unwrap();
        canvas.apply(&DrawEvent::StrokeEnd).unwrap();

        canvas
            .apply(&DrawEvent::Stroke(StrokePoint {
                x: 100.0,
                y: 100.0,
                color: "#ff0000".to_string(),
                width: 20.0,
                is_eraser: true,
                is_starting: true,
            }))
            .unwrap();
        canvas
            .apply(&DrawEvent::Stroke(StrokePoint {
                x: 200.0,
                y: 100.0,
                color: "#ff0000".to_string(),
                width: 20.0,
                is_eraser: true,
                is_starting: false,
            }))
            .unwrap();
        assert_eq!(canvas.pixel(150, 100), (255, 255, 255));
    }

    #[test]
    fn test_undo_removes_last_item_only() {
        let mut first = CanvasReplica::new();
        first.apply(&point(100.0, 100.0, "#000000", true)).unwrap();
        first.apply(&point(200.0, 100.0, "#000000", false)).unwrap();
        first.apply(&DrawEvent::StrokeEnd).unwrap();

        let mut second = CanvasReplica::new();
        second.apply(&point(100.0, 100.0, "#000000", true)).unwrap();
        second.apply(&point(200.0, 100.0, "#000000", false)).unwrap();
        second.apply(&DrawEvent::StrokeEnd).unwrap();
        second.apply(&point(100.0, 300.0, "#ff0000", true)).unwrap();
        second.apply(&point(200.0, 300.0, "#ff0000", false)).unwrap();
        second.apply(&DrawEvent::StrokeEnd).unwrap();

        second.undo().unwrap();
        assert_eq!(second.raster(), first.raster());
    }

    #[test]
    fn test_replay_is_idempotent_from_clear() {
        let events = vec![
            DrawEvent::Clear,
            point(100.0, 100.0, "#000000", true),
            point(300.0, 120.0, "#000000", false),
            DrawEvent::StrokeEnd,
            DrawEvent::Fill(FillAction {
                x: 10.0,
                y: 10.0,
                color: "#3b82f6".to_string(),
            }),
        ];

        let mut once = CanvasReplica::new();
        once.replay(&events).unwrap();

        let mut twice = CanvasReplica::new();
        twice.replay(&events).unwrap();
        twice.replay(&events).unwrap();

        assert_eq!(once.raster(), twice.raster());
    }

    #[test]
    fn test_flood_fill_noop_when_seed_matches() {
        let mut canvas = CanvasReplica::new();
        canvas.flood_fill(50.0, 50.0, "#ffffff").unwrap();
        assert_eq!(canvas.pixel(50, 50), (255, 255, 255));
        assert_eq!(canvas.pixel(1500, 800), (255, 255, 255));
    }

    #[test]
    fn test_flood_fill_stays_inside_boundary() {
        let mut canvas = CanvasReplica::new();
        // A thick vertical bar splitting the canvas in two.
        canvas
            .apply(&DrawEvent::Stroke(StrokePoint {
                x: 800.0,
                y: -50.0,
                color: "#000000".to_string(),
                width: 20.0,
                is_eraser: false,
                is_starting: true,
            }))
            .unwrap();
        canvas
            .apply(&DrawEvent::Stroke(StrokePoint {
                x: 800.0,
                y: 950.0,
                color: "#000000".to_string(),
                width: 20.0,
                is_eraser: false,
                is_starting: false,
            }))
            .unwrap();
        canvas.apply(&DrawEvent::StrokeEnd).unwrap();

        canvas.flood_fill(10.0, 10.0, "#ff0000").unwrap();
        assert_eq!(canvas.pixel(5, 5), (255, 0, 0));
        assert_eq!(canvas.pixel(400, 890), (255, 0, 0));
        assert_eq!(canvas.pixel(1590, 5), (255, 255, 255));
    }

    #[test]
    fn test_export_png() {
        let canvas = CanvasReplica::new();
        let png = canvas.to_png();
        // PNG magic bytes
        assert_eq!(&png[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
