//! Frame rendering: particles as filled discs, nearby pairs as fading lines.

use crate::config::BackdropConfig;
use crate::particles::{ConnectionFinder, ParticleField};
use crate::surface::{Surface, Tint};

/// What a single `render` call drew.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub particles: usize,
    pub connections: usize,
}

/// Draw the current field. Reads the field only.
pub fn render<S: Surface + ?Sized>(
    surface: &mut S,
    field: &ParticleField,
    config: &BackdropConfig,
) -> FrameStats {
    render_with(surface, field, config, &mut ConnectionFinder::new())
}

/// `render` with a caller-owned finder, so the link search keeps its grid
/// from one frame to the next.
pub fn render_with<S: Surface + ?Sized>(
    surface: &mut S,
    field: &ParticleField,
    config: &BackdropConfig,
    finder: &mut ConnectionFinder,
) -> FrameStats {
    surface.clear();

    let accent = config.palette.accent;
    for p in &field.particles {
        surface.fill_circle(p.pos.to_pos2(), p.size, Tint::new(accent, p.opacity));
    }

    let connections = finder.find(field, &config.connections);
    for conn in &connections {
        let a = field.particles[conn.particle_a].pos;
        let b = field.particles[conn.particle_b].pos;
        surface.line_segment(
            a.to_pos2(),
            b.to_pos2(),
            config.connections.thickness,
            Tint::new(accent, conn.alpha),
        );
    }

    FrameStats {
        particles: field.len(),
        connections: connections.len(),
    }
}
