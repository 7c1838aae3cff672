//! Configuration System for Hero Backdrop
//! Particle field, proximity links, palette and export settings

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Particle Configuration
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ParticleConfig {
    /// Number of particles created at activation
    pub count: usize,
    /// Radius range, half-open [min_size, max_size)
    pub min_size: f32,
    pub max_size: f32,
    /// Each velocity component is drawn from [-max_speed, max_speed)
    pub max_speed: f32,
    /// Opacity range, half-open [min_opacity, max_opacity)
    pub min_opacity: f32,
    pub max_opacity: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 50,
            min_size: 1.0,
            max_size: 4.0,
            max_speed: 0.25,
            min_opacity: 0.1,
            max_opacity: 0.6,
        }
    }
}

// ============================================================================
// Connection Configuration (proximity links between particles)
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Enable particle connections
    pub enabled: bool,

    /// Pairs closer than this (in surface pixels) are linked
    pub max_distance: f32,

    /// Line alpha for two coincident particles; falls off linearly to 0 at max_distance
    pub opacity: f32,

    /// Connection line thickness
    pub thickness: f32,

    /// Above this particle count the pair search goes through a spatial grid
    pub spatial_index_threshold: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_distance: 100.0,
            opacity: 0.2,
            thickness: 0.5,
            spatial_index_threshold: 256,
        }
    }
}

// ============================================================================
// Palette
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Palette {
    /// Hue shared by particles and links
    pub accent: [u8; 3],
    /// Straight-alpha RGBA the surface is cleared to
    pub background: [u8; 4],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            accent: [59, 130, 246],
            background: [0, 0, 0, 0],
        }
    }
}

// ============================================================================
// Export Configuration
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub width: u32,
    pub height: u32,
    pub frames: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frames: 120,
        }
    }
}

// ============================================================================
// Main Configuration
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct BackdropConfig {
    pub particles: ParticleConfig,
    pub connections: ConnectionConfig,
    pub palette: Palette,
    /// Fixed seed for reproducible initialization; entropy when unset
    pub seed: Option<u64>,
    pub export: ExportConfig,
}

impl BackdropConfig {
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject ranges the particle sampler cannot draw from.
    pub fn validate(&self) -> anyhow::Result<()> {
        let p = &self.particles;
        if !(p.min_size > 0.0 && p.min_size < p.max_size) {
            bail!(
                "particle size range [{}, {}) is empty or non-positive",
                p.min_size,
                p.max_size
            );
        }
        if !(p.min_opacity >= 0.0 && p.min_opacity < p.max_opacity && p.max_opacity <= 1.0) {
            bail!(
                "particle opacity range [{}, {}) must be a non-empty subrange of [0, 1]",
                p.min_opacity,
                p.max_opacity
            );
        }
        if !(p.max_speed >= 0.0) {
            bail!("max_speed must be non-negative, got {}", p.max_speed);
        }

        let c = &self.connections;
        if !(c.max_distance > 0.0) {
            bail!("connection max_distance must be positive, got {}", c.max_distance);
        }
        if !(0.0..=1.0).contains(&c.opacity) {
            bail!("connection opacity must lie in [0, 1], got {}", c.opacity);
        }

        if self.export.width == 0 || self.export.height == 0 {
            bail!(
                "export size {}x{} has no area",
                self.export.width,
                self.export.height
            );
        }
        Ok(())
    }
}
