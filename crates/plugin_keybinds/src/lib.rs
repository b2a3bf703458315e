//! Global hotkeys for the overlay.
//!
//! Binds three keys through the host's input layer: one toggles the overlay
//! window, one runs `/who` and one clears the player table. Keys default to
//! `1`, `2` and `3` and can be remapped in the settings.

use async_trait::async_trait;
use overlay_plugin_api::{HostContext, Plugin, PluginError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(windows)]
pub const NAME: &str = "KeybindsWindows";
#[cfg(not(windows))]
pub const NAME: &str = "KeybindsLinux";

pub const VERSION: &str = "0.0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    HideOverlay,
    Who,
    Reload,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::HideOverlay, Action::Who, Action::Reload];

    /// Settings entry holding the key for this action.
    pub fn setting(self) -> &'static str {
        match self {
            Action::HideOverlay => "Keybinds-HideOverlay",
            Action::Who => "Keybinds-Who",
            Action::Reload => "Keybinds-Reload",
        }
    }

    pub fn default_key(self) -> &'static str {
        match self {
            Action::HideOverlay => "1",
            Action::Who => "2",
            Action::Reload => "3",
        }
    }

    fn perform(self, host: &HostContext) {
        debug!("[{}] {:?} key released", NAME, self);
        match self {
            Action::HideOverlay => host.window.toggle_visibility(),
            Action::Who => host.logs.who(),
            Action::Reload => host.table.reset_table(),
        }
    }
}

pub struct KeybindsPlugin {
    host: HostContext,
    bindings: HashMap<String, Action>,
    /// Shared with the bound callbacks; they do nothing once this is cleared.
    active: Arc<AtomicBool>,
}

impl KeybindsPlugin {
    pub fn new(host: HostContext) -> Self {
        Self {
            host,
            bindings: HashMap::new(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Key configured for `action`, falling back to its default.
    pub fn key_for(&self, action: Action) -> String {
        self.host
            .settings
            .get_string(action.setting())
            .unwrap_or_else(|| action.default_key().to_string())
    }

    pub fn bindings(&self) -> &HashMap<String, Action> {
        &self.bindings
    }

    /// Runs the action bound to `key`. Returns `false` for unbound keys.
    pub fn trigger(&self, key: &str) -> bool {
        match self.bindings.get(key) {
            Some(action) => {
                action.perform(&self.host);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Plugin for KeybindsPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn is_disabled(&self) -> bool {
        false
    }

    async fn on_load(&mut self) -> Result<(), PluginError> {
        let mut bindings = HashMap::new();
        for action in Action::ALL {
            let key = self.key_for(action);
            if let Some(previous) = bindings.insert(key.clone(), action) {
                return Err(PluginError::InitializationFailed(format!(
                    "key {} is bound to both {:?} and {:?}",
                    key, previous, action
                )));
            }
        }

        // a fresh flag per load so callbacks from an earlier load stay dead
        let active = Arc::new(AtomicBool::new(true));
        for (key, action) in &bindings {
            let host = self.host.clone();
            let action = *action;
            let active = active.clone();
            self.host.hotkeys.bind(
                key,
                Arc::new(move || {
                    if active.load(Ordering::Acquire) {
                        action.perform(&host);
                    }
                }),
            );
        }

        self.active = active;
        self.bindings = bindings;
        info!("Loaded {} v{}", NAME, VERSION);
        Ok(())
    }

    async fn on_unload(&mut self) -> Result<(), PluginError> {
        self.active.store(false, Ordering::Release);
        self.bindings.clear();
        Ok(())
    }
}
