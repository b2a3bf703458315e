//! In-memory host used by plugin tests.
//!
//! `RecordingHost` implements every capability trait, answers prompts from a
//! scripted queue and records everything the plugins asked the host to do.

use crate::host::*;
use crate::PlayerIdentity;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A single call a plugin made against the player table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableUpdate {
    GlobalBlacklist {
        uuid: String,
        tooltip: String,
        icon: String,
        text: Option<String>,
    },
    LineColour {
        uuid: String,
        colour: String,
    },
    Reset,
}

#[derive(Default)]
pub struct RecordingHost {
    settings: Mutex<HashMap<String, Value>>,
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<(String, String)>>,
    notifications: Mutex<Vec<(String, String)>>,
    table: Mutex<Vec<TableUpdate>>,
    directory: Mutex<HashMap<String, PlayerIdentity>>,
    hotkeys: Mutex<HashMap<String, HotkeyCallback>>,
    who_calls: AtomicUsize,
    visibility_toggles: AtomicUsize,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Builds a context whose every capability is this host.
    pub fn context(self: &Arc<Self>) -> HostContext {
        HostContext {
            settings: self.clone(),
            window: self.clone(),
            notification: self.clone(),
            table: self.clone(),
            players: self.clone(),
            logs: self.clone(),
            hotkeys: self.clone(),
        }
    }

    /// Queues the answer for the next prompt. Unscripted prompts answer "".
    pub fn answer_prompt(&self, answer: impl Into<String>) {
        self.answers.lock().unwrap().push_back(answer.into());
    }

    pub fn add_player(&self, player: PlayerIdentity) {
        self.directory
            .lock()
            .unwrap()
            .insert(player.username.to_lowercase(), player);
    }

    pub fn set_setting(&self, name: &str, value: Value) {
        self.settings.lock().unwrap().insert(name.to_string(), value);
    }

    pub fn setting(&self, name: &str) -> Option<Value> {
        self.settings.lock().unwrap().get(name).cloned()
    }

    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn table_updates(&self) -> Vec<TableUpdate> {
        self.table.lock().unwrap().clone()
    }

    /// Row colour last set for a player, if any.
    pub fn line_colour(&self, uuid: &str) -> Option<String> {
        self.table
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|update| match update {
                TableUpdate::LineColour { uuid: u, colour } if u == uuid => Some(colour.clone()),
                _ => None,
            })
    }

    pub fn bound_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.hotkeys.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Simulates releasing a key. Returns whether anything was bound to it.
    pub fn press(&self, key: &str) -> bool {
        let callback = self.hotkeys.lock().unwrap().get(key).cloned();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn who_calls(&self) -> usize {
        self.who_calls.load(Ordering::SeqCst)
    }

    pub fn visibility_toggles(&self) -> usize {
        self.visibility_toggles.load(Ordering::SeqCst)
    }
}

impl SettingsStore for RecordingHost {
    fn get(&self, name: &str) -> Option<Value> {
        self.setting(name)
    }

    fn set(&self, name: &str, value: Value) {
        self.set_setting(name, value);
    }
}

impl OverlayWindow for RecordingHost {
    fn ask(&self, title: &str, message: &str) -> String {
        self.prompts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        self.answers.lock().unwrap().pop_front().unwrap_or_default()
    }

    fn toggle_visibility(&self) {
        self.visibility_toggles.fetch_add(1, Ordering::SeqCst);
    }
}

impl Notifier for RecordingHost {
    fn send(&self, title: &str, message: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

impl PlayerTable for RecordingHost {
    fn set_global_blacklist(&self, uuid: &str, tooltip: &str, icon: &str, text: Option<&str>) {
        self.table.lock().unwrap().push(TableUpdate::GlobalBlacklist {
            uuid: uuid.to_string(),
            tooltip: tooltip.to_string(),
            icon: icon.to_string(),
            text: text.map(str::to_string),
        });
    }

    fn set_line_colour(&self, uuid: &str, colour: &str) {
        self.table.lock().unwrap().push(TableUpdate::LineColour {
            uuid: uuid.to_string(),
            colour: colour.to_string(),
        });
    }

    fn reset_table(&self) {
        self.table.lock().unwrap().push(TableUpdate::Reset);
    }
}

impl PlayerDirectory for RecordingHost {
    fn lookup(&self, username: &str) -> Option<PlayerIdentity> {
        self.directory
            .lock()
            .unwrap()
            .get(&username.to_lowercase())
            .cloned()
    }
}

impl HostLogs for RecordingHost {
    fn who(&self) {
        self.who_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl HotkeyRegistrar for RecordingHost {
    fn bind(&self, key: &str, callback: HotkeyCallback) {
        self.hotkeys.lock().unwrap().insert(key.to_string(), callback);
    }
}
