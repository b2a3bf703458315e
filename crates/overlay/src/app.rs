//! The running overlay: configuration, host, plugins and the command loop.

use crate::cli::CliArgs;
use crate::commands::{Command, HELP};
use crate::config::AppConfig;
use crate::host::ConsoleHost;
use crate::logging::setup_logging;
use crate::settings::JsonSettingsStore;
use crate::signals::wait_for_shutdown;
use anyhow::Context;
use overlay_plugin_api::{HostContext, PlayerIdentity, Plugin};
use plugin_antisniper::AntisniperPlugin;
use plugin_keybinds::KeybindsPlugin;
use plugin_seraph::SeraphPlugin;
use plugin_system::PluginManager;
use std::io::Write;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

pub struct Application {
    host: Arc<ConsoleHost>,
    manager: PluginManager,
}

impl Application {
    /// Loads the configuration, applies CLI overrides, sets up logging and
    /// loads the plugins.
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(settings_path) = args.settings_path {
            config.overlay.settings_path = settings_path.to_string_lossy().to_string();
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

        setup_logging(&config.logging)?;
        info!(
            "Polsu overlay v{} | config: {}",
            env!("CARGO_PKG_VERSION"),
            args.config_path.display()
        );

        Self::build(config, ConsoleHost::new()).await
    }

    /// Opens the settings store, registers the enabled plugins and loads them.
    pub async fn build(config: AppConfig, host: Arc<ConsoleHost>) -> anyhow::Result<Self> {
        let settings = JsonSettingsStore::open(config.settings_path())?;
        info!("Plugin settings: {}", settings.path().display());

        let context = host.context(Arc::new(settings));
        let manager = PluginManager::new();

        for plugin in Self::plugins(&config, &context)? {
            manager.register(plugin).await?;
        }

        let enabled = manager.load_all().await;
        if enabled.is_empty() {
            warn!("No plugins are active");
        } else {
            info!("Active plugins: {}", enabled.join(", "));
        }

        Ok(Self { host, manager })
    }

    fn plugins(config: &AppConfig, context: &HostContext) -> anyhow::Result<Vec<Box<dyn Plugin>>> {
        let mut plugins: Vec<Box<dyn Plugin>> = Vec::new();

        if config.antisniper.enabled {
            let plugin = AntisniperPlugin::new(
                context.clone(),
                &config.antisniper.base_url,
                config.client_config(),
            )
            .context("creating the Antisniper client")?;
            plugins.push(Box::new(plugin));
        }

        if config.seraph.enabled {
            let plugin = SeraphPlugin::new(
                context.clone(),
                &config.seraph.base_url,
                config.client_config(),
            )
            .context("creating the Seraph client")?;
            plugins.push(Box::new(plugin));
        }

        if config.keybinds.enabled {
            plugins.push(Box::new(KeybindsPlugin::new(context.clone())));
        }

        Ok(plugins)
    }

    /// Executes one console command, writing any output to `out`.
    pub async fn handle(
        &self,
        command: Command,
        out: &mut dyn Write,
    ) -> std::io::Result<ControlFlow<()>> {
        match command {
            Command::Join { username, uuid } => {
                let player = PlayerIdentity::new(username, uuid);
                self.host.remember(player.clone());
                self.manager.player_inserted(&player).await;
            }
            Command::Who(names) => self.manager.who(&names).await,
            Command::List(names) => self.manager.list(&names).await,
            Command::Kill(name) => self.manager.final_kill(&name).await,
            Command::Key(key) => {
                if !self.host.press(&key) {
                    writeln!(
                        out,
                        "no hotkey bound to {} (bound: {})",
                        key,
                        self.host.bound_keys().join(", ")
                    )?;
                }
            }
            Command::Table => {
                let rows = self.host.rows();
                if rows.is_empty() {
                    writeln!(out, "player table is empty")?;
                }
                for (uuid, row) in rows {
                    writeln!(
                        out,
                        "{} icon={} text={} colour={}\n    {}",
                        uuid,
                        row.icon,
                        row.text.as_deref().unwrap_or("-"),
                        row.colour.as_deref().unwrap_or("-"),
                        row.tooltip
                    )?;
                }
                if !self.host.is_visible() {
                    writeln!(out, "(overlay hidden)")?;
                }
            }
            Command::Stats => {
                let stats = self.manager.stats().await;
                let json = serde_json::to_string_pretty(&stats).map_err(std::io::Error::other)?;
                writeln!(out, "{}", json)?;
                writeln!(
                    out,
                    "hotkeys: [{}] | /who requests: {}",
                    self.host.bound_keys().join(", "),
                    self.host.who_requests()
                )?;
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Reads commands from stdin until `quit`, end of input or a termination
    /// signal, then unloads the plugins.
    pub async fn run(self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let shutdown = wait_for_shutdown();
        tokio::pin!(shutdown);

        eprintln!("{}", HELP);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("reading commands from stdin")? else {
                        info!("End of input");
                        break;
                    };

                    let command = match line.parse::<Command>() {
                        Ok(command) => command,
                        Err(crate::commands::CommandError::Empty) => continue,
                        Err(e) => {
                            eprintln!("{}", e);
                            continue;
                        }
                    };

                    let mut stdout = std::io::stdout();
                    match self.handle(command, &mut stdout).await {
                        Ok(ControlFlow::Continue(())) => {}
                        Ok(ControlFlow::Break(())) => break,
                        Err(e) => error!("Failed to write output: {}", e),
                    }
                }
                result = &mut shutdown => {
                    result.context("installing signal handlers")?;
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.manager.unload_all().await;
        info!("Overlay shut down");
        Ok(())
    }
}
