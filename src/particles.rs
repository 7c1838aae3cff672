//! Particle field for Hero Backdrop
//! Drifting particles on a toroidal surface plus proximity-link search

use crate::config::{ConnectionConfig, ParticleConfig};
use egui::Vec2;
use rand::Rng;
use rayon::prelude::*;
use std::collections::HashMap;

/// Individual particle data
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub opacity: f32,
}

/// Owned particle set plus the surface bounds used for wrapping.
#[derive(Clone, Debug, Default)]
pub struct ParticleField {
    pub particles: Vec<Particle>,
    pub width: f32,
    pub height: f32,
}

impl ParticleField {
    /// Empty field with the given bounds.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            particles: Vec::new(),
            width,
            height,
        }
    }

    /// Populate `config.count` particles uniformly over `[0, width) x [0, height)`.
    pub fn initialize(
        config: &ParticleConfig,
        width: f32,
        height: f32,
        rng: &mut impl Rng,
    ) -> Self {
        let particles = (0..config.count)
            .map(|_| Particle {
                pos: Vec2::new(sample(rng, 0.0, width), sample(rng, 0.0, height)),
                vel: Vec2::new(
                    sample(rng, -config.max_speed, config.max_speed),
                    sample(rng, -config.max_speed, config.max_speed),
                ),
                size: sample(rng, config.min_size, config.max_size),
                opacity: sample(rng, config.min_opacity, config.max_opacity),
            })
            .collect();

        Self {
            particles,
            width,
            height,
        }
    }

    /// New wrap bounds. Particles stay where they are; anything now outside is
    /// corrected by the next `step`.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// One frame of Euler integration followed by edge wraparound.
    pub fn step(&mut self) {
        let (width, height) = (self.width, self.height);
        self.particles.par_iter_mut().for_each(|p| {
            p.pos += p.vel;
            p.pos.x = wrap(p.pos.x, width);
            p.pos.y = wrap(p.pos.y, height);
        });
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

/// Exiting one edge re-enters at the opposite one.
fn wrap(value: f32, extent: f32) -> f32 {
    if value < 0.0 {
        extent
    } else if value > extent {
        0.0
    } else {
        value
    }
}

/// Uniform sample from `[lo, hi)`, collapsing to `lo` for an empty range.
fn sample(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

// ============================================================================
// Connections
// ============================================================================

/// Link between two particles, `particle_a < particle_b`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connection {
    pub particle_a: usize,
    pub particle_b: usize,
    pub distance: f32,
    pub alpha: f32,
}

/// Line alpha for a pair `distance` apart, `None` at or beyond the threshold.
pub fn connection_alpha(distance: f32, config: &ConnectionConfig) -> Option<f32> {
    if distance < config.max_distance {
        Some(config.opacity * (1.0 - distance / config.max_distance))
    } else {
        None
    }
}

/// Every unordered pair closer than `max_distance`, sorted by `(a, b)`.
pub fn find_connections(field: &ParticleField, config: &ConnectionConfig) -> Vec<Connection> {
    ConnectionFinder::default().find(field, config)
}

/// Connection search that keeps its spatial grid between frames.
#[derive(Default)]
pub struct ConnectionFinder {
    grid: Option<SpatialGrid>,
}

impl ConnectionFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same result as [`find_connections`]; the grid buckets are reused.
    pub fn find(&mut self, field: &ParticleField, config: &ConnectionConfig) -> Vec<Connection> {
        if !config.enabled || field.len() < 2 {
            return Vec::new();
        }

        if field.len() <= config.spatial_index_threshold {
            return find_connections_pairwise(field, config);
        }

        let stale = self
            .grid
            .as_ref()
            .map_or(true, |grid| grid.cell_size != config.max_distance);
        if stale {
            self.grid = Some(SpatialGrid::new(config.max_distance));
        }
        let grid = self
            .grid
            .get_or_insert_with(|| SpatialGrid::new(config.max_distance));
        grid.clear();
        find_connections_grid(grid, field, config)
    }
}

fn link(field: &ParticleField, i: usize, j: usize, config: &ConnectionConfig) -> Option<Connection> {
    let d = field.particles[i].pos - field.particles[j].pos;
    let distance = (d.x * d.x + d.y * d.y).sqrt();
    connection_alpha(distance, config).map(|alpha| Connection {
        particle_a: i,
        particle_b: j,
        distance,
        alpha,
    })
}

fn find_connections_pairwise(field: &ParticleField, config: &ConnectionConfig) -> Vec<Connection> {
    let n = field.len();
    let mut connections = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if let Some(conn) = link(field, i, j, config) {
                connections.push(conn);
            }
        }
    }
    connections
}

fn find_connections_grid(
    grid: &mut SpatialGrid,
    field: &ParticleField,
    config: &ConnectionConfig,
) -> Vec<Connection> {
    for (i, p) in field.particles.iter().enumerate() {
        grid.insert(i, p.pos);
    }

    let mut connections = Vec::new();
    for (i, p) in field.particles.iter().enumerate() {
        for j in grid.query_radius(p.pos, config.max_distance) {
            if j <= i {
                continue;
            }
            if let Some(conn) = link(field, i, j, config) {
                connections.push(conn);
            }
        }
    }
    connections.sort_unstable_by_key(|c| (c.particle_a, c.particle_b));
    connections
}

/// Uniform bucket grid; cells are `cell_size` wide.
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Empty every bucket but keep the allocations.
    pub fn clear(&mut self) {
        for cells in self.cells.values_mut() {
            cells.clear();
        }
    }

    fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, index: usize, pos: Vec2) {
        let cell = self.cell_of(pos);
        self.cells.entry(cell).or_default().push(index);
    }

    pub fn query_radius(&self, pos: Vec2, radius: f32) -> Vec<usize> {
        let mut neighbors = Vec::new();
        let (cell_x, cell_y) = self.cell_of(pos);
        let search_range = (radius / self.cell_size).ceil() as i32;

        for dx in -search_range..=search_range {
            for dy in -search_range..=search_range {
                if let Some(indices) = self.cells.get(&(cell_x + dx, cell_y + dy)) {
                    neighbors.extend_from_slice(indices);
                }
            }
        }
        neighbors
    }
}
