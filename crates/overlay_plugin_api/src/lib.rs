//! # Overlay Plugin API
//!
//! The contract between the overlay host and its plugins. The host owns the
//! player table, the settings store, the notification system and every other
//! UI surface; plugins only see them through the narrow capability traits in
//! [`host`], bundled into a [`HostContext`] that is handed over at construction.
//!
//! ## Lifecycle
//!
//! 1. **Construction**: the plugin receives a [`HostContext`]
//! 2. **Load**: `on_load()` runs once; this is the only hook allowed to block
//!    (the API-key prompt)
//! 3. **Events**: `on_player_insert`, `on_final_kill`, `on_who` and `on_list`
//!    are dispatched while the plugin is enabled
//! 4. **Unload**: `on_unload()` runs once when the host shuts down
//!
//! ## Example
//!
//! ```rust,ignore
//! struct EchoPlugin;
//!
//! #[async_trait]
//! impl Plugin for EchoPlugin {
//!     fn name(&self) -> &str { "echo" }
//!     fn version(&self) -> &str { "1.0.0" }
//!     fn is_disabled(&self) -> bool { false }
//!
//!     async fn on_player_insert(&self, player: &PlayerIdentity) {
//!         tracing::info!("{} joined", player.username);
//!     }
//! }
//! ```

use async_trait::async_trait;

pub mod host;
mod identity;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use host::{
    HostContext, HostLogs, HotkeyCallback, HotkeyRegistrar, Notifier, OverlayWindow,
    PlayerDirectory, PlayerTable, SettingsStore,
};
pub use identity::PlayerIdentity;

// ============================================================================
// Plugin Trait
// ============================================================================

/// A plugin driven by the overlay host.
///
/// Every event hook has a no-op default so a plugin only implements what it
/// reacts to. Event hooks run on the host's interaction path and must never
/// wait on network I/O; background work is spawned and the hook returns.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Display name, unique among the registered plugins.
    fn name(&self) -> &str;

    /// Plugin version string.
    fn version(&self) -> &str;

    /// Whether the plugin has disabled itself for the rest of the session.
    ///
    /// A disabled plugin receives no further events from the host.
    fn is_disabled(&self) -> bool;

    /// Called once when the host loads the plugin.
    ///
    /// This is the single place where a plugin may block the interaction path,
    /// e.g. to prompt the user for an API key and validate it.
    async fn on_load(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called once when the host unloads the plugin.
    async fn on_unload(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// A player row was inserted into the table.
    async fn on_player_insert(&self, _player: &PlayerIdentity) {}

    /// A player was final-killed. Only the username is known at this point.
    async fn on_final_kill(&self, _username: &str) {}

    /// The `/who` command listed these players.
    async fn on_who(&self, _players: &[String]) {}

    /// The tab list reported these players.
    async fn on_list(&self, _players: &[String]) {}
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur during plugin operations.
///
/// None of these are fatal to the host; the plugin manager logs them and
/// carries on with the remaining plugins.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Plugin initialization failed during load
    #[error("Plugin initialization failed: {0}")]
    InitializationFailed(String),
    /// Error occurred during plugin execution
    #[error("Plugin execution error: {0}")]
    ExecutionError(String),
    /// Runtime error such as a panic inside a hook
    #[error("Plugin runtime error: {0}")]
    Runtime(String),
}
