//! Plugin registry for the overlay host.
//!
//! Plugins are linked into the host binary and registered at startup. The
//! manager owns them, drives their lifecycle and fans host events out to every
//! plugin that has not disabled itself.

use futures::FutureExt;
use overlay_plugin_api::{PlayerIdentity, Plugin, PluginError};
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

// ============================================================================
// Plugin Manager
// ============================================================================

/// Owns the registered plugins and routes host events to them.
pub struct PluginManager {
    /// Registered plugins, in registration order
    plugins: RwLock<Vec<LoadedPlugin>>,
    /// Number of events handed to plugins
    events_dispatched: AtomicU64,
}

/// A registered plugin with its metadata
struct LoadedPlugin {
    plugin: Box<dyn Plugin>,
    metadata: PluginMetadata,
}

#[derive(Debug, Clone)]
struct PluginMetadata {
    name: String,
    version: String,
    loaded_at: Option<SystemTime>,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
            events_dispatched: AtomicU64::new(0),
        }
    }

    /// Registers a plugin without loading it.
    pub async fn register(&self, plugin: Box<dyn Plugin>) -> Result<(), PluginError> {
        let name = plugin.name().to_string();
        let mut plugins = self.plugins.write().await;

        if plugins.iter().any(|p| p.metadata.name == name) {
            return Err(PluginError::ExecutionError(format!(
                "Plugin {} is already registered",
                name
            )));
        }

        debug!("Registered plugin: {} v{}", name, plugin.version());
        plugins.push(LoadedPlugin {
            metadata: PluginMetadata {
                name,
                version: plugin.version().to_string(),
                loaded_at: None,
            },
            plugin,
        });
        Ok(())
    }

    /// Runs `on_load` for every registered plugin, in registration order.
    ///
    /// A plugin whose `on_load` fails is logged and dropped; the others keep
    /// loading. Returns the names of the plugins that loaded and are enabled.
    pub async fn load_all(&self) -> Vec<String> {
        let mut plugins = self.plugins.write().await;
        let mut failed = Vec::new();

        info!("Loading {} plugins", plugins.len());

        for loaded in plugins.iter_mut() {
            match loaded.plugin.on_load().await {
                Ok(()) => {
                    loaded.metadata.loaded_at = Some(SystemTime::now());
                    if loaded.plugin.is_disabled() {
                        warn!("Plugin {} disabled itself while loading", loaded.metadata.name);
                    } else {
                        info!(
                            "Plugin {} v{} loaded",
                            loaded.metadata.name, loaded.metadata.version
                        );
                    }
                }
                Err(e) => {
                    error!("Plugin {} failed to load: {}", loaded.metadata.name, e);
                    failed.push(loaded.metadata.name.clone());
                }
            }
        }

        plugins.retain(|p| !failed.contains(&p.metadata.name));

        let enabled: Vec<String> = plugins
            .iter()
            .filter(|p| !p.plugin.is_disabled())
            .map(|p| p.metadata.name.clone())
            .collect();

        info!(
            "Plugin loading complete: {} enabled, {} disabled, {} failed",
            enabled.len(),
            plugins.len() - enabled.len(),
            failed.len()
        );
        enabled
    }

    // ------------------------------------------------------------------------
    // Event dispatch
    // ------------------------------------------------------------------------

    pub async fn player_inserted(&self, player: &PlayerIdentity) {
        let plugins = self.plugins.read().await;
        for loaded in plugins.iter().filter(|p| !p.plugin.is_disabled()) {
            self.guarded(loaded, "on_player_insert", loaded.plugin.on_player_insert(player))
                .await;
        }
    }

    pub async fn final_kill(&self, username: &str) {
        let plugins = self.plugins.read().await;
        for loaded in plugins.iter().filter(|p| !p.plugin.is_disabled()) {
            self.guarded(loaded, "on_final_kill", loaded.plugin.on_final_kill(username))
                .await;
        }
    }

    pub async fn who(&self, players: &[String]) {
        let plugins = self.plugins.read().await;
        for loaded in plugins.iter().filter(|p| !p.plugin.is_disabled()) {
            self.guarded(loaded, "on_who", loaded.plugin.on_who(players)).await;
        }
    }

    pub async fn list(&self, players: &[String]) {
        let plugins = self.plugins.read().await;
        for loaded in plugins.iter().filter(|p| !p.plugin.is_disabled()) {
            self.guarded(loaded, "on_list", loaded.plugin.on_list(players)).await;
        }
    }

    /// Runs one hook. A panic is logged and the remaining plugins still run.
    async fn guarded<F>(&self, loaded: &LoadedPlugin, hook: &str, call: F)
    where
        F: Future<Output = ()>,
    {
        self.count();
        if AssertUnwindSafe(call).catch_unwind().await.is_err() {
            let e = PluginError::Runtime(format!("{} panicked in {}", loaded.metadata.name, hook));
            error!("{}", e);
        }
    }

    fn count(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    // ------------------------------------------------------------------------
    // Shutdown and introspection
    // ------------------------------------------------------------------------

    /// Runs `on_unload` for every plugin and empties the registry.
    pub async fn unload_all(&self) {
        let mut plugins = self.plugins.write().await;

        info!("Unloading {} plugins", plugins.len());

        for mut loaded in plugins.drain(..) {
            if let Err(e) = loaded.plugin.on_unload().await {
                error!("Error unloading plugin {}: {}", loaded.metadata.name, e);
            }
        }

        info!("All plugins unloaded");
    }

    /// Names of every registered plugin, enabled or not.
    pub async fn plugin_names(&self) -> Vec<String> {
        let plugins = self.plugins.read().await;
        plugins.iter().map(|p| p.metadata.name.clone()).collect()
    }

    pub async fn get_plugin_info(&self, name: &str) -> Option<PluginInfo> {
        let plugins = self.plugins.read().await;
        plugins
            .iter()
            .find(|p| p.metadata.name == name)
            .map(PluginInfo::from)
    }

    pub async fn stats(&self) -> PluginSystemStats {
        let plugins = self.plugins.read().await;
        let infos: Vec<PluginInfo> = plugins.iter().map(PluginInfo::from).collect();

        PluginSystemStats {
            total_plugins: infos.len(),
            enabled_plugins: infos.iter().filter(|p| p.enabled).count(),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            plugins: infos,
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PluginSystemStats {
    pub total_plugins: usize,
    pub enabled_plugins: usize,
    pub events_dispatched: u64,
    pub plugins: Vec<PluginInfo>,
}

/// Information about a registered plugin
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub enabled: bool,
    pub loaded_at: Option<SystemTime>,
}

impl From<&LoadedPlugin> for PluginInfo {
    fn from(loaded: &LoadedPlugin) -> Self {
        Self {
            name: loaded.metadata.name.clone(),
            version: loaded.metadata.version.clone(),
            enabled: !loaded.plugin.is_disabled(),
            loaded_at: loaded.metadata.loaded_at,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    // Mock plugin that journals every hook it receives
    struct TestPlugin {
        name: String,
        disable_on_load: bool,
        fail_on_load: bool,
        panic_on_kill: bool,
        disabled: bool,
        journal: Journal,
    }

    impl TestPlugin {
        fn new(name: &str, journal: &Journal) -> Self {
            Self {
                name: name.to_string(),
                disable_on_load: false,
                fail_on_load: false,
                panic_on_kill: false,
                disabled: false,
                journal: journal.clone(),
            }
        }

        fn record(&self, entry: String) {
            self.journal.lock().unwrap().push(entry);
        }
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn is_disabled(&self) -> bool {
            self.disabled
        }

        async fn on_load(&mut self) -> Result<(), PluginError> {
            if self.fail_on_load {
                return Err(PluginError::InitializationFailed("boom".into()));
            }
            self.disabled = self.disable_on_load;
            self.record(format!("{}:load", self.name));
            Ok(())
        }

        async fn on_unload(&mut self) -> Result<(), PluginError> {
            self.record(format!("{}:unload", self.name));
            Ok(())
        }

        async fn on_player_insert(&self, player: &PlayerIdentity) {
            self.record(format!("{}:insert:{}", self.name, player.username));
        }

        async fn on_final_kill(&self, username: &str) {
            if self.panic_on_kill {
                panic!("{} cannot handle kills", self.name);
            }
            self.record(format!("{}:kill:{}", self.name, username));
        }

        async fn on_who(&self, players: &[String]) {
            self.record(format!("{}:who:{}", self.name, players.join(",")));
        }

        async fn on_list(&self, players: &[String]) {
            self.record(format!("{}:list:{}", self.name, players.len()));
        }
    }

    #[tokio::test]
    async fn test_plugin_manager_creation() {
        let manager = PluginManager::new();
        assert!(manager.plugin_names().await.is_empty());
        assert_eq!(manager.stats().await.total_plugins, 0);
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let journal = Journal::default();
        let manager = PluginManager::new();

        manager
            .register(Box::new(TestPlugin::new("a", &journal)))
            .await
            .unwrap();
        let result = manager.register(Box::new(TestPlugin::new("a", &journal))).await;

        assert!(matches!(result, Err(PluginError::ExecutionError(_))));
        assert_eq!(manager.plugin_names().await, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_load_all_drops_failures() {
        let journal = Journal::default();
        let manager = PluginManager::new();

        let mut broken = TestPlugin::new("broken", &journal);
        broken.fail_on_load = true;
        let mut quiet = TestPlugin::new("quiet", &journal);
        quiet.disable_on_load = true;

        manager.register(Box::new(TestPlugin::new("a", &journal))).await.unwrap();
        manager.register(Box::new(broken)).await.unwrap();
        manager.register(Box::new(quiet)).await.unwrap();

        let enabled = manager.load_all().await;

        assert_eq!(enabled, vec!["a".to_string()]);
        assert_eq!(manager.plugin_names().await, vec!["a", "quiet"]);
        assert!(manager.get_plugin_info("broken").await.is_none());
        assert!(!manager.get_plugin_info("quiet").await.unwrap().enabled);
        assert!(manager.get_plugin_info("a").await.unwrap().loaded_at.is_some());
    }

    #[tokio::test]
    async fn test_events_skip_disabled_plugins() {
        let journal = Journal::default();
        let manager = PluginManager::new();

        let mut quiet = TestPlugin::new("quiet", &journal);
        quiet.disable_on_load = true;
        manager.register(Box::new(TestPlugin::new("a", &journal))).await.unwrap();
        manager.register(Box::new(quiet)).await.unwrap();
        manager.load_all().await;
        journal.lock().unwrap().clear();

        manager
            .player_inserted(&PlayerIdentity::new("Steve", "u1"))
            .await;
        manager.final_kill("Alex").await;
        manager.who(&["x".to_string(), "y".to_string()]).await;
        manager.list(&["x".to_string()]).await;

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["a:insert:Steve", "a:kill:Alex", "a:who:x,y", "a:list:1"]
        );

        let stats = manager.stats().await;
        assert_eq!(stats.total_plugins, 2);
        assert_eq!(stats.enabled_plugins, 1);
        assert_eq!(stats.events_dispatched, 4);
    }

    #[tokio::test]
    async fn test_panicking_hook_does_not_stop_dispatch() {
        let journal = Journal::default();
        let manager = PluginManager::new();

        let mut fragile = TestPlugin::new("fragile", &journal);
        fragile.panic_on_kill = true;
        manager.register(Box::new(fragile)).await.unwrap();
        manager.register(Box::new(TestPlugin::new("b", &journal))).await.unwrap();
        manager.load_all().await;

        manager.final_kill("Alex").await;
        manager.final_kill("Steve").await;

        let entries = journal.lock().unwrap().clone();
        assert_eq!(
            entries,
            vec!["fragile:load", "b:load", "b:kill:Alex", "b:kill:Steve"]
        );
        assert_eq!(manager.stats().await.events_dispatched, 4);
    }

    #[tokio::test]
    async fn test_unload_all_empties_registry() {
        let journal = Journal::default();
        let manager = PluginManager::new();

        manager.register(Box::new(TestPlugin::new("a", &journal))).await.unwrap();
        manager.register(Box::new(TestPlugin::new("b", &journal))).await.unwrap();
        manager.load_all().await;
        manager.unload_all().await;

        let entries = journal.lock().unwrap().clone();
        assert_eq!(entries, vec!["a:load", "b:load", "a:unload", "b:unload"]);
        assert!(manager.plugin_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_serialize() {
        let journal = Journal::default();
        let manager = PluginManager::new();
        manager.register(Box::new(TestPlugin::new("a", &journal))).await.unwrap();

        let json = serde_json::to_value(manager.stats().await).unwrap();
        assert_eq!(json["total_plugins"], 1);
        assert_eq!(json["plugins"][0]["name"], "a");
    }
}
