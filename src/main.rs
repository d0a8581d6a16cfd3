mod app;
mod data;
mod theme;
mod util;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Exported graph payload (JSON). Uses a built-in demo graph if omitted.
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Frame rate the simulation loop is capped at.
    #[arg(long, default_value_t = 40.0)]
    target_fps: f32,

    /// Start with the light theme.
    #[arg(long)]
    light: bool,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 860.0]),
        ..Default::default()
    };

    eframe::run_native(
        "site-graph",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::SiteGraphApp::new(
                cc,
                args.graph.clone(),
                args.target_fps,
                args.light,
            )))
        }),
    )
}
