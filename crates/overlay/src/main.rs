//! Console host for the overlay plugins.
//!
//! Loads `overlay.toml`, opens the plugin settings file, registers the
//! Antisniper, Seraph and Keybinds plugins and then reads game events as
//! commands from stdin.

mod app;
mod cli;
mod commands;
mod config;
mod host;
mod logging;
mod settings;
mod signals;

use app::Application;
use cli::CliArgs;
use tracing::error;

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let app = match Application::new(args).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to start the overlay: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("Overlay error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
