//! Pages and routing
//! Two routes exist: the hero landing page and a catch-all "not found" view.
//! `Site` ties the particle backdrop's lifetime to the home route.

use crate::config::BackdropConfig;
use crate::driver::{AnimationDriver, FrameOutcome, Viewport, ViewportBus};
use crate::surface::Surface;
use egui::{Align, Color32, Layout, RichText};

pub const BRAND: &str = "AptosSecure";

pub struct NavLink {
    pub name: &'static str,
    pub href: &'static str,
}

pub const NAV_LINKS: &[NavLink] = &[
    NavLink { name: "Home", href: "/" },
    NavLink { name: "Automated Security", href: "/automated-security" },
    NavLink { name: "Implementation", href: "/implementation/access-control" },
    NavLink { name: "Testing", href: "/testing" },
    NavLink { name: "Resources", href: "/resources" },
    NavLink { name: "Blog", href: "/blog" },
];

const HERO_BADGE: &str = "Cutting-edge Aptos Security";
const HERO_TITLE: &str = "Automated Security in Aptos Move Smart Contracts";
const HERO_SUBTITLE: &str = "Build secure, tamper-proof smart contracts with automated protection \
                             mechanisms. Keep your blockchain applications safe from attacks.";

const ACCENT: Color32 = Color32::from_rgb(37, 99, 235);
const MUTED: Color32 = Color32::from_rgb(75, 85, 99);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    NotFound { path: String },
}

impl Route {
    /// Map a location to a route. Query strings and fragments are ignored.
    pub fn resolve(location: &str) -> Self {
        let path = location
            .trim()
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        match path {
            "" | "/" => Route::Home,
            other => Route::NotFound {
                path: other.to_string(),
            },
        }
    }
}

/// Navigation history. Always holds at least one entry.
pub struct Router {
    history: Vec<String>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Router {
    pub fn new(initial: &str) -> Self {
        let router = Self {
            history: vec![initial.to_string()],
        };
        router.report_miss();
        router
    }

    pub fn path(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or("/")
    }

    pub fn current(&self) -> Route {
        Route::resolve(self.path())
    }

    pub fn navigate(&mut self, location: &str) -> Route {
        if self.path() != location {
            self.history.push(location.to_string());
            self.report_miss();
        }
        self.current()
    }

    /// Pop one entry; the first entry is never removed.
    pub fn back(&mut self) -> Route {
        if self.history.len() > 1 {
            self.history.pop();
        }
        self.current()
    }

    fn report_miss(&self) {
        if let Route::NotFound { path } = self.current() {
            log::error!(
                "404 Error: User attempted to access non-existent route: {}",
                path
            );
        }
    }
}

/// What the user asked for while a page was drawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageAction {
    None,
    Navigate(String),
    Back,
}

pub fn nav_bar(ui: &mut egui::Ui) -> PageAction {
    let mut action = PageAction::None;
    ui.horizontal(|ui| {
        if ui
            .add(egui::Label::new(RichText::new(BRAND).strong().size(18.0)).sense(egui::Sense::click()))
            .clicked()
        {
            action = PageAction::Navigate("/".to_string());
        }
        ui.add_space(24.0);
        for link in NAV_LINKS {
            if ui.link(link.name).clicked() {
                action = PageAction::Navigate(link.href.to_string());
            }
        }
    });
    action
}

/// Hero copy drawn on top of the particle backdrop.
pub fn hero(ui: &mut egui::Ui) -> PageAction {
    let mut action = PageAction::None;
    ui.with_layout(Layout::top_down(Align::Center), |ui| {
        ui.add_space(ui.available_height() * 0.25);
        ui.label(RichText::new(HERO_BADGE).color(ACCENT).size(14.0));
        ui.add_space(16.0);
        ui.label(RichText::new(HERO_TITLE).strong().size(40.0));
        ui.add_space(16.0);
        ui.label(RichText::new(HERO_SUBTITLE).color(MUTED).size(18.0));
        ui.add_space(32.0);
        ui.horizontal(|ui| {
            if ui.button("Learn About Automated Security →").clicked() {
                action = PageAction::Navigate("/automated-security".to_string());
            }
            if ui.button("Get Started with Secure Coding").clicked() {
                action = PageAction::Navigate("/implementation/access-control".to_string());
            }
        });
    });
    action
}

pub fn not_found(ui: &mut egui::Ui) -> PageAction {
    let mut action = PageAction::None;
    ui.with_layout(Layout::top_down(Align::Center), |ui| {
        ui.add_space(ui.available_height() * 0.3);
        ui.label(RichText::new("404").color(ACCENT).strong().size(48.0));
        ui.add_space(16.0);
        ui.label(RichText::new("Page Not Found").strong().size(28.0));
        ui.add_space(8.0);
        ui.label(
            RichText::new("Sorry, we couldn't find the page you're looking for.")
                .color(MUTED)
                .size(18.0),
        );
        ui.add_space(24.0);
        ui.horizontal(|ui| {
            if ui.button("Return Home").clicked() {
                action = PageAction::Navigate("/".to_string());
            }
            if ui.button("Go Back").clicked() {
                action = PageAction::Back;
            }
        });
    });
    action
}

/// Apply a page action to the router; returns the route now showing.
pub fn apply(router: &mut Router, action: PageAction) -> Route {
    match action {
        PageAction::None => router.current(),
        PageAction::Navigate(location) => router.navigate(&location),
        PageAction::Back => router.back(),
    }
}

// ============================================================================
// Site
// ============================================================================

/// Router plus the backdrop that exists only while the home page is shown.
pub struct Site {
    config: BackdropConfig,
    router: Router,
    bus: ViewportBus,
    backdrop: Option<AnimationDriver>,
    last_viewport: Option<Viewport>,
}

impl Site {
    pub fn new(config: BackdropConfig, initial: &str) -> Self {
        Self {
            config,
            router: Router::new(initial),
            bus: ViewportBus::new(),
            backdrop: None,
            last_viewport: None,
        }
    }

    pub fn current(&self) -> Route {
        self.router.current()
    }

    pub fn bus(&self) -> &ViewportBus {
        &self.bus
    }

    pub fn backdrop(&self) -> Option<&AnimationDriver> {
        self.backdrop.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.backdrop.as_ref().is_some_and(AnimationDriver::is_running)
    }

    /// Apply a page action. Leaving the home route tears the backdrop down.
    pub fn apply(&mut self, action: PageAction) -> Route {
        let route = apply(&mut self.router, action);
        if route != Route::Home {
            self.stop_backdrop();
        }
        route
    }

    pub fn navigate(&mut self, location: &str) -> Route {
        self.apply(PageAction::Navigate(location.to_string()))
    }

    pub fn back(&mut self) -> Route {
        self.apply(PageAction::Back)
    }

    /// Drive one backdrop frame for the home page.
    ///
    /// Starts a fresh driver on first use after (re)entering home and
    /// forwards viewport changes to the running one. Off the home route
    /// nothing is drawn.
    pub fn render_backdrop<S: Surface + ?Sized>(
        &mut self,
        viewport: Viewport,
        surface: &mut S,
    ) -> FrameOutcome {
        if self.current() != Route::Home {
            self.stop_backdrop();
            return FrameOutcome::Inactive;
        }

        let driver = self
            .backdrop
            .get_or_insert_with(|| AnimationDriver::new(self.config.clone()));
        if !driver.is_running() {
            driver.activate(&self.bus, Some(viewport));
        } else if self.last_viewport != Some(viewport) {
            self.bus.publish(viewport);
        }
        self.last_viewport = Some(viewport);

        driver.frame(surface)
    }

    /// Cancel and drop the backdrop, if any.
    pub fn stop_backdrop(&mut self) {
        if let Some(mut driver) = self.backdrop.take() {
            driver.deactivate();
        }
        self.last_viewport = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::RecordingSurface;

    fn seeded_site(initial: &str) -> Site {
        let config = BackdropConfig {
            seed: Some(4),
            ..BackdropConfig::default()
        };
        Site::new(config, initial)
    }

    #[test]
    fn root_resolves_home() {
        assert_eq!(Route::resolve("/"), Route::Home);
        assert_eq!(Route::resolve(""), Route::Home);
        assert_eq!(Route::resolve("/?ref=ad#top"), Route::Home);
    }

    #[test]
    fn everything_else_is_not_found() {
        assert_eq!(
            Route::resolve("/blog"),
            Route::NotFound {
                path: "/blog".to_string()
            }
        );
        assert_eq!(
            Route::resolve("/testing?x=1"),
            Route::NotFound {
                path: "/testing".to_string()
            }
        );
    }

    #[test]
    fn back_returns_to_previous_route() {
        let mut router = Router::default();
        assert_eq!(router.navigate("/resources"), Route::resolve("/resources"));
        assert_eq!(router.back(), Route::Home);
        // Bottom of the stack stays put
        assert_eq!(router.back(), Route::Home);
        assert_eq!(router.path(), "/");
    }

    #[test]
    fn navigating_to_current_path_does_not_grow_history() {
        let mut router = Router::new("/blog");
        router.navigate("/blog");
        router.navigate("/");
        assert_eq!(router.back(), Route::resolve("/blog"));
        assert_eq!(router.back(), Route::resolve("/blog"));
    }

    #[test]
    fn actions_drive_router() {
        let mut router = Router::default();
        assert_eq!(
            apply(&mut router, PageAction::Navigate("/testing".into())),
            Route::resolve("/testing")
        );
        assert_eq!(apply(&mut router, PageAction::None), Route::resolve("/testing"));
        assert_eq!(apply(&mut router, PageAction::Back), Route::Home);
    }

    #[test]
    fn only_home_link_is_routable() {
        let routable: Vec<_> = NAV_LINKS
            .iter()
            .filter(|link| Route::resolve(link.href) == Route::Home)
            .map(|link| link.name)
            .collect();
        assert_eq!(routable, vec!["Home"]);
    }

    #[test]
    fn home_page_runs_the_backdrop() {
        let mut site = seeded_site("/");
        let viewport = Viewport::new(320.0, 200.0, 1.0);
        let mut surface = RecordingSurface::default();

        assert!(matches!(
            site.render_backdrop(viewport, &mut surface),
            FrameOutcome::Rendered(_)
        ));
        assert!(site.is_animating());
        assert_eq!(site.bus().listener_count(), 1);
        assert_eq!(surface.circles(), 50);
    }

    #[test]
    fn navigating_away_tears_the_backdrop_down() {
        let mut site = seeded_site("/");
        let viewport = Viewport::new(320.0, 200.0, 1.0);
        let mut surface = RecordingSurface::default();
        site.render_backdrop(viewport, &mut surface);
        let token = site.backdrop().map(AnimationDriver::token).unwrap();

        assert_eq!(site.navigate("/blog"), Route::resolve("/blog"));
        assert!(!site.is_animating());
        assert!(site.backdrop().is_none());
        assert!(token.is_cancelled());
        assert_eq!(site.bus().listener_count(), 0);

        // The host keeps calling in; nothing more is drawn
        let mut after = RecordingSurface::default();
        assert_eq!(
            site.render_backdrop(viewport, &mut after),
            FrameOutcome::Inactive
        );
        assert!(after.ops.is_empty());
        assert_eq!(site.bus().listener_count(), 0);
    }

    #[test]
    fn returning_home_starts_a_fresh_backdrop() {
        let mut site = seeded_site("/");
        let viewport = Viewport::new(320.0, 200.0, 1.0);
        let mut surface = RecordingSurface::default();
        site.render_backdrop(viewport, &mut surface);
        site.render_backdrop(viewport, &mut surface);
        assert_eq!(site.backdrop().map(AnimationDriver::frames_rendered), Some(2));

        site.navigate("/testing");
        assert_eq!(site.back(), Route::Home);
        assert!(site.backdrop().is_none());

        site.render_backdrop(viewport, &mut surface);
        assert!(site.is_animating());
        assert_eq!(site.backdrop().map(AnimationDriver::frames_rendered), Some(1));
        assert_eq!(site.bus().listener_count(), 1);
    }

    #[test]
    fn viewport_changes_reach_the_running_field() {
        let mut site = seeded_site("/");
        let mut surface = RecordingSurface::default();
        site.render_backdrop(Viewport::new(320.0, 200.0, 1.0), &mut surface);
        site.render_backdrop(Viewport::new(160.0, 100.0, 2.0), &mut surface);

        let field = site.backdrop().and_then(AnimationDriver::field).unwrap();
        assert_eq!((field.width, field.height), (320.0, 200.0));

        site.render_backdrop(Viewport::new(400.0, 100.0, 1.0), &mut surface);
        let field = site.backdrop().and_then(AnimationDriver::field).unwrap();
        assert_eq!((field.width, field.height), (400.0, 100.0));
    }

    #[test]
    fn starting_on_a_missing_page_never_animates() {
        let mut site = seeded_site("/resources");
        let mut surface = RecordingSurface::default();
        assert_eq!(
            site.render_backdrop(Viewport::new(320.0, 200.0, 1.0), &mut surface),
            FrameOutcome::Inactive
        );
        assert!(site.backdrop().is_none());
        assert_eq!(site.bus().listener_count(), 0);
    }
}
