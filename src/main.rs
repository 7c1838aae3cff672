//! Hero Backdrop - Main Application
//! Desktop preview of the landing page with its particle backdrop, plus a
//! headless PNG export mode.

use anyhow::bail;
use clap::{Parser, Subcommand};
use eframe::egui;
use hero_backdrop::config::BackdropConfig;
use hero_backdrop::driver::Viewport;
use hero_backdrop::export::{spawn_headless_export, ExportMessage};
use hero_backdrop::pages::{self, PageAction, Route, Site};
use hero_backdrop::surface::PainterSurface;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hero-backdrop", version, about = "Particle backdrop preview and export")]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Initial location shown in the window
    #[arg(long, default_value = "/")]
    route: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a PNG sequence without opening a window
    Export {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        frames: Option<u64>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Write the default configuration as JSON
    WriteConfig { path: PathBuf },
}

/// Main application state
struct BackdropApp {
    site: Site,
    background: [u8; 4],
}

impl BackdropApp {
    fn new(cc: &eframe::CreationContext<'_>, config: BackdropConfig, route: &str) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        Self {
            background: config.palette.background,
            site: Site::new(config, route),
        }
    }

    /// Paint the backdrop under whatever `ui` draws next.
    fn render_backdrop(&mut self, ui: &egui::Ui, pixels_per_point: f32) {
        let rect = ui.max_rect();
        let viewport = Viewport::new(rect.width(), rect.height(), pixels_per_point);
        let painter = ui.painter_at(rect);
        let mut surface = PainterSurface::new(&painter, rect, pixels_per_point, self.background);
        self.site.render_backdrop(viewport, &mut surface);
    }
}

impl eframe::App for BackdropApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut action = PageAction::None;
        egui::TopBottomPanel::top("nav_bar").show(ctx, |ui| {
            action = pages::nav_bar(ui);
        });

        let route = self.site.current();
        let page_fill = egui::Color32::from_rgb(245, 248, 255);
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(page_fill))
            .show(ctx, |ui| {
                let page_action = match route {
                    Route::Home => {
                        self.render_backdrop(ui, ctx.pixels_per_point());
                        pages::hero(ui)
                    }
                    Route::NotFound { .. } => pages::not_found(ui),
                };
                if page_action != PageAction::None {
                    action = page_action;
                }
            });

        self.site.apply(action);

        if self.site.is_animating() {
            ctx.request_repaint();
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BackdropConfig> {
    match path {
        Some(path) => BackdropConfig::load(path),
        None => Ok(BackdropConfig::default()),
    }
}

fn run_export(
    mut config: BackdropConfig,
    out: PathBuf,
    frames: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(frames) = frames {
        config.export.frames = frames;
    }
    if let Some(width) = width {
        config.export.width = width;
    }
    if let Some(height) = height {
        config.export.height = height;
    }
    if seed.is_some() {
        config.seed = seed;
    }

    let (rx, _token) = spawn_headless_export(config, out);
    for msg in rx.iter() {
        match msg {
            ExportMessage::Progress(current, total) => {
                if current % 30 == 0 || current == total {
                    log::info!("exported {}/{} frames", current, total);
                }
            }
            ExportMessage::Completed(path) => {
                println!("Export completed: {}", path.display());
                return Ok(());
            }
            ExportMessage::Error(e) => bail!("export failed: {}", e),
        }
    }
    bail!("export thread exited without reporting a result")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Some(Command::Export {
            out,
            frames,
            width,
            height,
            seed,
        }) => run_export(config, out, frames, width, height, seed),
        Some(Command::WriteConfig { path }) => {
            config.save(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        None => {
            let options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default()
                    .with_inner_size([1280.0, 800.0])
                    .with_title(pages::BRAND)
                    .with_min_inner_size([640.0, 480.0]),
                ..Default::default()
            };
            let route = args.route;
            eframe::run_native(
                pages::BRAND,
                options,
                Box::new(move |cc| Box::new(BackdropApp::new(cc, config, &route))),
            )
            .map_err(|e| anyhow::anyhow!("window failed: {}", e))
        }
    }
}
