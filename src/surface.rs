//! Drawing surfaces the backdrop renders into.
//!
//! Coordinates are surface pixels (device pixels). `PainterSurface` maps them
//! back to egui points; `offscreen_render::FrameRenderer` rasterizes them
//! directly.

use egui::{Color32, Painter, Pos2, Rect, Stroke};

/// Straight (unmultiplied) colour with a float alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tint {
    pub rgb: [u8; 3],
    pub alpha: f32,
}

impl Tint {
    pub fn new(rgb: [u8; 3], alpha: f32) -> Self {
        Self { rgb, alpha }
    }

    pub fn to_color32(self) -> Color32 {
        let a = (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color32::from_rgba_unmultiplied(self.rgb[0], self.rgb[1], self.rgb[2], a)
    }
}

/// 2D pixel target. One `clear` per frame, then any number of primitives.
pub trait Surface {
    /// Reset the whole drawing region.
    fn clear(&mut self);

    fn fill_circle(&mut self, center: Pos2, radius: f32, tint: Tint);

    fn line_segment(&mut self, from: Pos2, to: Pos2, thickness: f32, tint: Tint);
}

/// Surface backed by an egui painter clipped to `rect`.
pub struct PainterSurface<'a> {
    painter: &'a Painter,
    rect: Rect,
    pixels_per_point: f32,
    background: Color32,
}

impl<'a> PainterSurface<'a> {
    pub fn new(painter: &'a Painter, rect: Rect, pixels_per_point: f32, background: [u8; 4]) -> Self {
        Self {
            painter,
            rect,
            pixels_per_point: pixels_per_point.max(f32::EPSILON),
            background: Color32::from_rgba_unmultiplied(
                background[0],
                background[1],
                background[2],
                background[3],
            ),
        }
    }

    fn to_screen(&self, pos: Pos2) -> Pos2 {
        self.rect.min + pos.to_vec2() / self.pixels_per_point
    }
}

impl Surface for PainterSurface<'_> {
    fn clear(&mut self) {
        // egui starts every frame blank; only an opaque-ish background needs painting.
        if self.background.a() > 0 {
            self.painter.rect_filled(self.rect, 0.0, self.background);
        }
    }

    fn fill_circle(&mut self, center: Pos2, radius: f32, tint: Tint) {
        let color = tint.to_color32();
        if color.a() == 0 {
            return;
        }
        self.painter.circle_filled(self.to_screen(center), radius, color);
    }

    fn line_segment(&mut self, from: Pos2, to: Pos2, thickness: f32, tint: Tint) {
        let color = tint.to_color32();
        if color.a() == 0 {
            return;
        }
        self.painter.line_segment(
            [self.to_screen(from), self.to_screen(to)],
            Stroke::new(thickness, color),
        );
    }
}
