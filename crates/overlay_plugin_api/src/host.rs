//! Host capabilities exposed to plugins.
//!
//! Each trait is one narrow slice of what the overlay offers. Implementations
//! live in the host; plugins only ever hold `Arc<dyn Trait>` handles obtained
//! from a [`HostContext`].

use crate::PlayerIdentity;
use serde_json::Value;
use std::sync::Arc;

/// Persistent key/value settings owned by the host.
pub trait SettingsStore: Send + Sync {
    /// Returns the stored value, or `None` when the setting was never written.
    fn get(&self, name: &str) -> Option<Value>;

    /// Stores a value. Persistence is the host's concern.
    fn set(&self, name: &str, value: Value);

    /// Returns a non-empty string setting.
    fn get_string(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Returns a list-of-strings setting. Non-string items are skipped.
    fn get_string_list(&self, name: &str) -> Option<Vec<String>> {
        match self.get(name) {
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// The overlay window.
pub trait OverlayWindow: Send + Sync {
    /// Shows a modal text prompt and blocks until the user answers.
    ///
    /// Returns an empty string when the user cancels or submits nothing.
    fn ask(&self, title: &str, message: &str) -> String;

    /// Shows the overlay if hidden, hides it otherwise.
    fn toggle_visibility(&self);
}

/// Desktop notifications.
pub trait Notifier: Send + Sync {
    fn send(&self, title: &str, message: &str);
}

/// The shared on-screen player table.
pub trait PlayerTable: Send + Sync {
    /// Sets the global blacklist cell of a row: tooltip markup, icon name and
    /// an optional short display text.
    fn set_global_blacklist(&self, uuid: &str, tooltip: &str, icon: &str, text: Option<&str>);

    /// Overrides the colour of a row, e.g. `#FF0000`.
    fn set_line_colour(&self, uuid: &str, colour: &str);

    /// Clears every row.
    fn reset_table(&self);
}

/// The host's cache of players it has already resolved.
pub trait PlayerDirectory: Send + Sync {
    /// Looks a player up by username (case-insensitive on the host side).
    fn lookup(&self, username: &str) -> Option<PlayerIdentity>;
}

/// Access to the game log reader.
pub trait HostLogs: Send + Sync {
    /// Asks the host to run `/who` and refresh the table from the result.
    fn who(&self);
}

/// Callback run when a bound hotkey is released.
pub type HotkeyCallback = Arc<dyn Fn() + Send + Sync>;

/// Global hotkey binding provided by the host's input layer.
pub trait HotkeyRegistrar: Send + Sync {
    fn bind(&self, key: &str, callback: HotkeyCallback);
}

/// Every capability a plugin may use, injected at construction.
#[derive(Clone)]
pub struct HostContext {
    pub settings: Arc<dyn SettingsStore>,
    pub window: Arc<dyn OverlayWindow>,
    pub notification: Arc<dyn Notifier>,
    pub table: Arc<dyn PlayerTable>,
    pub players: Arc<dyn PlayerDirectory>,
    pub logs: Arc<dyn HostLogs>,
    pub hotkeys: Arc<dyn HotkeyRegistrar>,
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext").finish_non_exhaustive()
    }
}
