//! Hero Backdrop
//! Ambient particle field with proximity links: simulation, rendering,
//! animation driver, headless export and the pages that host it.

pub mod config;
pub mod driver;
pub mod export;
pub mod offscreen_render;
pub mod pages;
pub mod particles;
pub mod render;
pub mod surface;

pub use config::BackdropConfig;
pub use driver::{AnimationDriver, CancellationToken, FrameOutcome, Viewport, ViewportBus};
pub use pages::Site;
pub use particles::{Particle, ParticleField};
pub use render::{render, FrameStats};
pub use surface::{Surface, Tint};
