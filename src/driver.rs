//! Animation driver for Hero Backdrop
//! Owns the particle field for one activation and runs step + render once per
//! frame until cancelled. The same loop serves the egui host (one `frame` per
//! repaint) and a dedicated render thread (`run` with a `FrameClock`).

use crate::config::BackdropConfig;
use crate::particles::{ConnectionFinder, ParticleField};
use crate::render::{render_with, FrameStats};
use crate::surface::Surface;
use crossbeam_channel::{tick, unbounded, Receiver, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// ============================================================================
// Viewport
// ============================================================================

/// Displayed size of the host container, in points, plus pixel density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixels_per_point: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, pixels_per_point: f32) -> Self {
        Self {
            width,
            height,
            pixels_per_point,
        }
    }

    /// A container with no area (or no density) has no drawable surface yet.
    pub fn is_attached(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.pixels_per_point > 0.0
    }

    /// Surface size in device pixels.
    pub fn surface_size(&self) -> (f32, f32) {
        (
            (self.width * self.pixels_per_point).floor(),
            (self.height * self.pixels_per_point).floor(),
        )
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Shared stop flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Resize notifications
// ============================================================================

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<(u64, Sender<Viewport>)>,
}

/// Fan-out of "viewport resized" notifications.
#[derive(Clone, Default)]
pub struct ViewportBus {
    inner: Arc<Mutex<BusInner>>,
}

impl ViewportBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener. It stays registered until the `Subscription` drops.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = unbounded();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, tx));
        Subscription {
            id,
            rx,
            bus: self.clone(),
        }
    }

    /// Deliver `viewport` to every live listener; returns how many received it.
    pub fn publish(&self, viewport: Viewport) -> usize {
        let mut inner = self.lock();
        inner.listeners.retain(|(_, tx)| tx.send(viewport).is_ok());
        inner.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.lock().listeners.retain(|(listener, _)| *listener != id);
    }
}

/// Registered resize listener.
pub struct Subscription {
    id: u64,
    rx: Receiver<Viewport>,
    bus: ViewportBus,
}

impl Subscription {
    /// Most recent pending notification; older ones are discarded.
    pub fn latest(&self) -> Option<Viewport> {
        self.rx.try_iter().last()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

// ============================================================================
// Frame clocks
// ============================================================================

/// Source of the "about to paint" signal.
pub trait FrameClock {
    /// Block until the next frame is due. `false` means no more frames will come.
    fn wait_for_frame(&mut self) -> bool;
}

/// Fixed-rate ticker for a dedicated render thread.
pub struct TickClock {
    ticker: Receiver<Instant>,
}

impl TickClock {
    pub fn new(fps: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        Self {
            ticker: tick(period),
        }
    }
}

impl FrameClock for TickClock {
    fn wait_for_frame(&mut self) -> bool {
        self.ticker.recv().is_ok()
    }
}

/// Yields exactly `n` frames without waiting. Headless rendering.
pub struct FrameBudget {
    remaining: u64,
}

impl FrameBudget {
    pub fn new(frames: u64) -> Self {
        Self { remaining: frames }
    }
}

impl FrameClock for FrameBudget {
    fn wait_for_frame(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Result of a single `AnimationDriver::frame` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered(FrameStats),
    /// Never activated (no surface yet)
    Inactive,
    /// Torn down; nothing was stepped or drawn
    Cancelled,
}

enum DriverState {
    Idle,
    Running {
        field: ParticleField,
        finder: ConnectionFinder,
        listener: Subscription,
    },
    Stopped,
}

pub struct AnimationDriver {
    config: BackdropConfig,
    token: CancellationToken,
    state: DriverState,
    frames: u64,
}

impl AnimationDriver {
    pub fn new(config: BackdropConfig) -> Self {
        Self {
            config,
            token: CancellationToken::new(),
            state: DriverState::Idle,
            frames: 0,
        }
    }

    /// Handle another thread can use to stop the loop.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DriverState::Running { .. })
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn field(&self) -> Option<&ParticleField> {
        match &self.state {
            DriverState::Running { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Create the field and register for resizes. Without an attached surface
    /// this does nothing and returns `false`.
    pub fn activate(&mut self, bus: &ViewportBus, viewport: Option<Viewport>) -> bool {
        match self.state {
            DriverState::Idle => {}
            DriverState::Running { .. } => return true,
            DriverState::Stopped => return false,
        }
        if self.token.is_cancelled() {
            self.state = DriverState::Stopped;
            return false;
        }

        let Some(viewport) = viewport.filter(Viewport::is_attached) else {
            log::debug!("backdrop surface unavailable, skipping activation");
            return false;
        };

        let (width, height) = viewport.surface_size();
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let field = ParticleField::initialize(&self.config.particles, width, height, &mut rng);
        log::info!(
            "backdrop activated: {} particles on {}x{} px",
            field.len(),
            width,
            height
        );

        self.state = DriverState::Running {
            field,
            finder: ConnectionFinder::new(),
            listener: bus.subscribe(),
        };
        true
    }

    /// One animation frame: apply the latest resize, step once, render once.
    pub fn frame<S: Surface + ?Sized>(&mut self, surface: &mut S) -> FrameOutcome {
        if self.token.is_cancelled() {
            self.deactivate();
            return FrameOutcome::Cancelled;
        }

        let (field, finder, listener) = match &mut self.state {
            DriverState::Running {
                field,
                finder,
                listener,
            } => (field, finder, listener),
            DriverState::Idle => return FrameOutcome::Inactive,
            DriverState::Stopped => return FrameOutcome::Cancelled,
        };

        if let Some(viewport) = listener.latest() {
            if viewport.is_attached() {
                let (width, height) = viewport.surface_size();
                log::debug!("backdrop resized to {}x{} px", width, height);
                field.resize(width, height);
            }
        }

        field.step();
        let stats = render_with(surface, field, &self.config, finder);
        self.frames += 1;
        FrameOutcome::Rendered(stats)
    }

    /// Run frames as `clock` delivers them until cancelled or the clock ends.
    /// Returns the number of frames rendered by this call.
    pub fn run<C, S>(&mut self, clock: &mut C, surface: &mut S) -> u64
    where
        C: FrameClock + ?Sized,
        S: Surface + ?Sized,
    {
        let mut rendered = 0;
        loop {
            if self.token.is_cancelled() || !self.is_running() {
                break;
            }
            if !clock.wait_for_frame() {
                break;
            }
            match self.frame(surface) {
                FrameOutcome::Rendered(_) => rendered += 1,
                FrameOutcome::Inactive | FrameOutcome::Cancelled => break,
            }
        }
        if self.token.is_cancelled() {
            self.deactivate();
        }
        rendered
    }

    /// Cancel the loop, release the resize listener and drop the field.
    /// Safe to call any number of times.
    pub fn deactivate(&mut self) {
        self.token.cancel();
        let previous = std::mem::replace(&mut self.state, DriverState::Stopped);
        if let DriverState::Running { .. } = previous {
            log::info!("backdrop stopped after {} frames", self.frames);
        }
    }
}

impl Drop for AnimationDriver {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParticleConfig;
    use crate::render::tests::{Op, RecordingSurface};

    fn seeded(count: usize) -> BackdropConfig {
        BackdropConfig {
            particles: ParticleConfig {
                count,
                ..ParticleConfig::default()
            },
            seed: Some(17),
            ..BackdropConfig::default()
        }
    }

    /// Cancels its token once `after` frames have been handed out.
    struct CancelAfter {
        after: u32,
        given: u32,
        token: CancellationToken,
    }

    impl FrameClock for CancelAfter {
        fn wait_for_frame(&mut self) -> bool {
            if self.given == self.after {
                self.token.cancel();
            }
            self.given += 1;
            true
        }
    }

    #[test]
    fn viewport_surface_size_scales_by_density() {
        let viewport = Viewport::new(100.5, 50.0, 2.0);
        assert_eq!(viewport.surface_size(), (201.0, 100.0));
        assert!(viewport.is_attached());
        assert!(!Viewport::new(0.0, 50.0, 2.0).is_attached());
    }

    #[test]
    fn activation_without_surface_is_silent_noop() {
        let bus = ViewportBus::new();
        let mut driver = AnimationDriver::new(seeded(5));

        assert!(!driver.activate(&bus, None));
        assert!(!driver.activate(&bus, Some(Viewport::new(0.0, 0.0, 1.0))));
        assert!(!driver.is_running());
        assert_eq!(bus.listener_count(), 0);

        let mut surface = RecordingSurface::default();
        assert_eq!(driver.frame(&mut surface), FrameOutcome::Inactive);
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn activation_builds_field_and_registers_listener() {
        let bus = ViewportBus::new();
        let mut driver = AnimationDriver::new(seeded(8));

        assert!(driver.activate(&bus, Some(Viewport::new(100.0, 60.0, 2.0))));
        assert!(driver.is_running());
        assert_eq!(bus.listener_count(), 1);

        let field = driver.field().unwrap();
        assert_eq!(field.len(), 8);
        assert_eq!((field.width, field.height), (200.0, 120.0));

        // Activating again does not double-register
        assert!(driver.activate(&bus, Some(Viewport::new(100.0, 60.0, 2.0))));
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn seeded_activation_is_reproducible() {
        let bus = ViewportBus::new();
        let viewport = Some(Viewport::new(320.0, 200.0, 1.0));
        let mut a = AnimationDriver::new(seeded(20));
        let mut b = AnimationDriver::new(seeded(20));
        a.activate(&bus, viewport);
        b.activate(&bus, viewport);
        assert_eq!(a.field().unwrap().particles, b.field().unwrap().particles);
    }

    #[test]
    fn frame_steps_then_renders() {
        let bus = ViewportBus::new();
        let mut driver = AnimationDriver::new(seeded(6));
        driver.activate(&bus, Some(Viewport::new(400.0, 300.0, 1.0)));
        let before = driver.field().unwrap().particles.clone();

        let mut surface = RecordingSurface::default();
        let outcome = driver.frame(&mut surface);

        let FrameOutcome::Rendered(stats) = outcome else {
            panic!("expected a rendered frame, got {outcome:?}");
        };
        assert_eq!(stats.particles, 6);
        assert_eq!(surface.circles(), 6);
        assert_eq!(driver.frames_rendered(), 1);

        let after = &driver.field().unwrap().particles;
        assert_eq!(after.len(), before.len());
        for (old, new) in before.iter().zip(after) {
            assert_eq!(old.vel, new.vel);
            assert_eq!(old.size, new.size);
        }

        // Circles are drawn at the stepped positions
        if let Op::Circle { center, .. } = &surface.ops[1] {
            assert_eq!(*center, after[0].pos.to_pos2());
        } else {
            panic!("expected a circle after clear");
        }
    }

    #[test]
    fn resize_updates_bounds_without_reinitializing() {
        let bus = ViewportBus::new();
        let mut config = seeded(10);
        config.particles.max_speed = 0.0;
        let mut driver = AnimationDriver::new(config);
        driver.activate(&bus, Some(Viewport::new(200.0, 200.0, 1.0)));
        let before = driver.field().unwrap().particles.clone();

        assert_eq!(bus.publish(Viewport::new(150.0, 100.0, 2.0)), 1);
        assert_eq!(bus.publish(Viewport::new(500.0, 400.0, 1.0)), 1);

        let mut surface = RecordingSurface::default();
        driver.frame(&mut surface);

        let field = driver.field().unwrap();
        assert_eq!((field.width, field.height), (500.0, 400.0));
        assert_eq!(field.particles, before);
    }

    #[test]
    fn detached_resize_keeps_previous_bounds() {
        let bus = ViewportBus::new();
        let mut driver = AnimationDriver::new(seeded(3));
        driver.activate(&bus, Some(Viewport::new(200.0, 100.0, 1.0)));
        bus.publish(Viewport::new(0.0, 0.0, 1.0));

        driver.frame(&mut RecordingSurface::default());
        let field = driver.field().unwrap();
        assert_eq!((field.width, field.height), (200.0, 100.0));
    }

    #[test]
    fn teardown_is_idempotent_and_final() {
        let bus = ViewportBus::new();
        let mut driver = AnimationDriver::new(seeded(4));
        driver.activate(&bus, Some(Viewport::new(100.0, 100.0, 1.0)));

        driver.deactivate();
        driver.deactivate();

        assert!(!driver.is_running());
        assert_eq!(bus.listener_count(), 0);
        assert!(driver.token().is_cancelled());

        let mut surface = RecordingSurface::default();
        assert_eq!(driver.frame(&mut surface), FrameOutcome::Cancelled);
        assert!(surface.ops.is_empty());
        assert_eq!(driver.run(&mut FrameBudget::new(10), &mut surface), 0);
        assert!(surface.ops.is_empty());

        // A stopped driver cannot be revived
        assert!(!driver.activate(&bus, Some(Viewport::new(100.0, 100.0, 1.0))));
    }

    #[test]
    fn dropping_driver_releases_listener() {
        let bus = ViewportBus::new();
        {
            let mut driver = AnimationDriver::new(seeded(2));
            driver.activate(&bus, Some(Viewport::new(50.0, 50.0, 1.0)));
            assert_eq!(bus.listener_count(), 1);
        }
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.publish(Viewport::new(10.0, 10.0, 1.0)), 0);
    }

    #[test]
    fn run_honours_frame_budget() {
        let bus = ViewportBus::new();
        let mut driver = AnimationDriver::new(seeded(5));
        driver.activate(&bus, Some(Viewport::new(100.0, 100.0, 1.0)));

        let mut surface = RecordingSurface::default();
        assert_eq!(driver.run(&mut FrameBudget::new(7), &mut surface), 7);
        assert_eq!(driver.frames_rendered(), 7);
        assert!(driver.is_running());
    }

    #[test]
    fn external_cancel_stops_run_and_releases_listener() {
        let bus = ViewportBus::new();
        let mut driver = AnimationDriver::new(seeded(5));
        driver.activate(&bus, Some(Viewport::new(100.0, 100.0, 1.0)));

        let mut clock = CancelAfter {
            after: 3,
            given: 0,
            token: driver.token(),
        };
        let mut surface = RecordingSurface::default();
        assert_eq!(driver.run(&mut clock, &mut surface), 3);
        assert!(!driver.is_running());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn render_thread_stops_on_cancel() {
        let bus = ViewportBus::new();
        let mut driver = AnimationDriver::new(seeded(5));
        driver.activate(&bus, Some(Viewport::new(64.0, 64.0, 1.0)));
        let token = driver.token();

        let handle = std::thread::spawn(move || {
            let mut surface = RecordingSurface::default();
            driver.run(&mut TickClock::new(240), &mut surface)
        });
        std::thread::sleep(Duration::from_millis(50));
        token.cancel();

        let frames = handle.join().unwrap();
        assert!(frames > 0);
        assert_eq!(bus.listener_count(), 0);
    }
}
