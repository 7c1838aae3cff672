//! CPU (headless) offscreen renderer.
//!
//! Used for the PNG export path and anywhere a window is not available.
//! Rasterizes into float RGB + float alpha buffers (straight alpha, OVER
//! compositing) and quantizes to RGBA8 on demand.

use crate::surface::{Surface, Tint};
use egui::Pos2;
use image::RgbaImage;
use rayon::prelude::*;

/// Simple CPU renderer.
pub struct FrameRenderer {
    width: u32,
    height: u32,
    /// RGB buffer in 0..255 float space.
    rgb: Vec<f32>,
    /// Alpha buffer in 0..1.
    alpha: Vec<f32>,
    background: [u8; 4],
}

impl FrameRenderer {
    pub fn new(width: u32, height: u32, background: [u8; 4]) -> Self {
        let px = (width as usize) * (height as usize);
        let mut renderer = Self {
            width,
            height,
            rgb: vec![0.0; px * 3],
            alpha: vec![0.0; px],
            background,
        };
        renderer.clear();
        renderer
    }

    /// Straight-alpha pixel at `(x, y)`, `None` off-surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) as usize;
        let base = idx * 3;
        Some([
            self.rgb[base],
            self.rgb[base + 1],
            self.rgb[base + 2],
            self.alpha[idx],
        ])
    }

    /// Composite `tint` with partial `coverage` over one pixel.
    fn blend(&mut self, px: i32, py: i32, tint: Tint, coverage: f32) {
        let a = (tint.alpha * coverage).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }

        let idx = (py as u32 * self.width + px as u32) as usize;
        let base = idx * 3;
        let da = self.alpha[idx];
        let out_a = a + da * (1.0 - a);

        // Straight alpha OVER
        for (c, &src) in tint.rgb.iter().enumerate() {
            let dst = self.rgb[base + c];
            self.rgb[base + c] = if out_a > 0.0 {
                (src as f32 * a + dst * da * (1.0 - a)) / out_a
            } else {
                0.0
            };
        }
        self.alpha[idx] = out_a;
    }

    /// Inclusive pixel bounds of a float box, clipped to the surface.
    fn clip_box(&self, min: (f32, f32), max: (f32, f32)) -> Option<(i32, i32, i32, i32)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let min_x = min.0.floor().max(0.0) as i32;
        let min_y = min.1.floor().max(0.0) as i32;
        let max_x = max.0.ceil().min(self.width as f32 - 1.0) as i32;
        let max_y = max.1.ceil().min(self.height as f32 - 1.0) as i32;
        if min_x > max_x || min_y > max_y {
            None
        } else {
            Some((min_x, min_y, max_x, max_y))
        }
    }

    /// Quantize to an RGBA8 image.
    pub fn to_image(&self) -> RgbaImage {
        let mut out = vec![0u8; self.alpha.len() * 4];
        out.par_chunks_mut(4).enumerate().for_each(|(i, px)| {
            let base = i * 3;
            px[0] = self.rgb[base].clamp(0.0, 255.0).round() as u8;
            px[1] = self.rgb[base + 1].clamp(0.0, 255.0).round() as u8;
            px[2] = self.rgb[base + 2].clamp(0.0, 255.0).round() as u8;
            px[3] = (self.alpha[i].clamp(0.0, 1.0) * 255.0).round() as u8;
        });
        // Buffer length is width * height * 4 by construction.
        RgbaImage::from_raw(self.width, self.height, out).unwrap_or_default()
    }
}

impl Surface for FrameRenderer {
    fn clear(&mut self) {
        let [r, g, b, a] = self.background;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let a = a as f32 / 255.0;
        self.rgb
            .par_chunks_mut(3)
            .zip(self.alpha.par_iter_mut())
            .for_each(|(px, alpha)| {
                px[0] = r;
                px[1] = g;
                px[2] = b;
                *alpha = a;
            });
    }

    fn fill_circle(&mut self, center: Pos2, radius: f32, tint: Tint) {
        if radius <= 0.0 || tint.alpha <= 0.0 {
            return;
        }
        let Some((min_x, min_y, max_x, max_y)) = self.clip_box(
            (center.x - radius - 1.0, center.y - radius - 1.0),
            (center.x + radius + 1.0, center.y + radius + 1.0),
        ) else {
            return;
        };

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let dx = px as f32 + 0.5 - center.x;
                let dy = py as f32 + 0.5 - center.y;
                let dist = (dx * dx + dy * dy).sqrt();
                // One-pixel anti-aliased rim
                let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(px, py, tint, coverage);
                }
            }
        }
    }

    fn line_segment(&mut self, from: Pos2, to: Pos2, thickness: f32, tint: Tint) {
        if tint.alpha <= 0.0 {
            return;
        }
        // Hairlines are drawn one pixel wide with alpha scaled by their width
        let (half, weight) = if thickness < 1.0 {
            (0.5, thickness.max(0.0))
        } else {
            (thickness * 0.5, 1.0)
        };
        let pad = half + 1.0;
        let Some((min_x, min_y, max_x, max_y)) = self.clip_box(
            (from.x.min(to.x) - pad, from.y.min(to.y) - pad),
            (from.x.max(to.x) + pad, from.y.max(to.y) + pad),
        ) else {
            return;
        };

        let seg = to - from;
        let len_sq = seg.length_sq();
        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let p = Pos2::new(px as f32 + 0.5, py as f32 + 0.5);
                let t = if len_sq > 0.0 {
                    ((p - from).dot(seg) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let dist = (p - (from + seg * t)).length();
                let coverage = (half + 0.5 - dist).clamp(0.0, 1.0) * weight;
                if coverage > 0.0 {
                    self.blend(px, py, tint, coverage);
                }
            }
        }
    }
}
