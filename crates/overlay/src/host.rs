//! Terminal implementation of the host capabilities.
//!
//! Prompts read a line from stdin, notifications and table updates are logged,
//! and the player table is kept in memory so it can be printed on demand.

use overlay_plugin_api::{
    HostContext, HostLogs, HotkeyCallback, HotkeyRegistrar, Notifier, OverlayWindow,
    PlayerDirectory, PlayerIdentity, PlayerTable, SettingsStore,
};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Reads one line of user input.
pub type LineReader = Box<dyn FnMut() -> std::io::Result<String> + Send>;

fn stdin_line() -> std::io::Result<String> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}

/// What the table shows for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub tooltip: String,
    pub icon: String,
    pub text: Option<String>,
    pub colour: Option<String>,
}

pub struct ConsoleHost {
    input: Mutex<LineReader>,
    rows: Mutex<BTreeMap<String, TableRow>>,
    players: Mutex<HashMap<String, PlayerIdentity>>,
    hotkeys: Mutex<HashMap<String, HotkeyCallback>>,
    visible: AtomicBool,
    who_requests: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConsoleHost {
    pub fn new() -> Arc<Self> {
        Self::with_input(Box::new(stdin_line))
    }

    pub fn with_input(input: LineReader) -> Arc<Self> {
        Arc::new(Self {
            input: Mutex::new(input),
            rows: Mutex::new(BTreeMap::new()),
            players: Mutex::new(HashMap::new()),
            hotkeys: Mutex::new(HashMap::new()),
            visible: AtomicBool::new(true),
            who_requests: AtomicUsize::new(0),
        })
    }

    /// Bundles this host with a settings store into a plugin context.
    pub fn context(self: &Arc<Self>, settings: Arc<dyn SettingsStore>) -> HostContext {
        HostContext {
            settings,
            window: self.clone(),
            notification: self.clone(),
            table: self.clone(),
            players: self.clone(),
            logs: self.clone(),
            hotkeys: self.clone(),
        }
    }

    /// Records a player the game reported, replacing any earlier entry with
    /// the same name.
    pub fn remember(&self, player: PlayerIdentity) {
        lock(&self.players).insert(player.username.to_lowercase(), player);
    }

    /// Runs the callback bound to `key`. Returns whether one was bound.
    pub fn press(&self, key: &str) -> bool {
        let callback = lock(&self.hotkeys).get(key).cloned();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn bound_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.hotkeys).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn rows(&self) -> BTreeMap<String, TableRow> {
        lock(&self.rows).clone()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn who_requests(&self) -> usize {
        self.who_requests.load(Ordering::SeqCst)
    }
}

impl OverlayWindow for ConsoleHost {
    fn ask(&self, title: &str, message: &str) -> String {
        eprint!("[{}] {} ", title, message);
        let _ = std::io::stderr().flush();

        let mut input = lock(&self.input);
        match (*input)() {
            Ok(line) => line.trim().to_string(),
            Err(e) => {
                warn!("Could not read an answer for {}: {}", title, e);
                String::new()
            }
        }
    }

    fn toggle_visibility(&self) {
        let visible = !self.visible.fetch_xor(true, Ordering::SeqCst);
        info!("Overlay is now {}", if visible { "shown" } else { "hidden" });
    }
}

impl Notifier for ConsoleHost {
    fn send(&self, title: &str, message: &str) {
        info!(target: "notification", "{}: {}", title, message);
    }
}

impl PlayerTable for ConsoleHost {
    fn set_global_blacklist(&self, uuid: &str, tooltip: &str, icon: &str, text: Option<&str>) {
        debug!("Table update for {}: icon={} text={:?}", uuid, icon, text);
        let mut rows = lock(&self.rows);
        let row = rows.entry(uuid.to_string()).or_default();
        row.tooltip = tooltip.to_string();
        row.icon = icon.to_string();
        row.text = text.map(str::to_string);
    }

    fn set_line_colour(&self, uuid: &str, colour: &str) {
        lock(&self.rows).entry(uuid.to_string()).or_default().colour = Some(colour.to_string());
    }

    fn reset_table(&self) {
        info!("Player table reset");
        lock(&self.rows).clear();
    }
}

impl PlayerDirectory for ConsoleHost {
    fn lookup(&self, username: &str) -> Option<PlayerIdentity> {
        lock(&self.players).get(&username.to_lowercase()).cloned()
    }
}

impl HostLogs for ConsoleHost {
    fn who(&self) {
        self.who_requests.fetch_add(1, Ordering::SeqCst);
        info!("Requested /who from the game");
    }
}

impl HotkeyRegistrar for ConsoleHost {
    fn bind(&self, key: &str, callback: HotkeyCallback) {
        if lock(&self.hotkeys).insert(key.to_string(), callback).is_some() {
            warn!("Hotkey {} was rebound", key);
        }
    }
}
