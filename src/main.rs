//! QuadViewAnalyzer - Main Entry Point
//!
//! Desktop viewer for recorded MATLAB signal logs. Pass `--demo` to start
//! with a built-in synthetic recording instead of loading a file.

use quadview_rs::{AppState, QuadViewApp};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,quadview_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting QuadViewAnalyzer");

    let mut app_state = AppState::load_or_default();
    app_state.cleanup_missing_files();

    let demo = std::env::args().any(|arg| arg == "--demo");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("QuadViewAnalyzer"),
        ..Default::default()
    };

    eframe::run_native(
        "QuadViewAnalyzer",
        native_options,
        Box::new(move |cc| {
            let mut app = QuadViewApp::new(cc, app_state);
            if demo {
                tracing::info!("Loading built-in demo recording");
                app.load_demo();
            }
            Ok(Box::new(app))
        }),
    )
}
