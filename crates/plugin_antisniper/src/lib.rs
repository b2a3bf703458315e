//! Antisniper blacklist plugin.
//!
//! Looks every inserted player up against the Antisniper blacklist, plus any
//! shared blacklists the user subscribed to with tokens, and marks
//! blacklisted players red in the player table.

use async_trait::async_trait;
use lookup_core::client::require_success;
use lookup_core::{
    ApiClient, ApiKeyBootstrap, ClientConfig, KeyValidator, LookupError, LookupPipeline,
};
use overlay_plugin_api::{HostContext, PlayerIdentity, Plugin, PluginError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

mod batch;
mod format;

pub use format::BlacklistAnnotator;

use batch::Target;

pub const NAME: &str = "AntisniperBL";
pub const VERSION: &str = "0.0.1";
pub const DEFAULT_API: &str = "https://api.antisniper.net";

const TITLE: &str = "AntisniperBL Plugin";
const KEY_SETTING: &str = "Antisniper-APIKey";
const TOKENS_SETTING: &str = "Antisniper-BlacklistTokens";
const KEY_HEADER: &str = "Apikey";
const USER_PATH: &str = "/v2/user";

/// Checks a key against `GET /v2/user`.
struct UserEndpointValidator {
    client: ApiClient,
}

#[async_trait]
impl KeyValidator for UserEndpointValidator {
    async fn validate(&self, key: &str) -> bool {
        let Ok(client) = self.client.with_header(KEY_HEADER, key) else {
            return false;
        };
        match client.get(USER_PATH).await.and_then(require_success) {
            Ok(_) => true,
            Err(e) => {
                debug!("[{}] API key check failed: {}", NAME, e);
                false
            }
        }
    }
}

pub struct AntisniperPlugin {
    host: HostContext,
    /// Client without credentials, used for key validation
    api: ApiClient,
    /// Client carrying the validated key
    client: Option<ApiClient>,
    tokens: Arc<Vec<String>>,
    pipeline: Option<LookupPipeline>,
    disabled: bool,
}

impl AntisniperPlugin {
    pub fn new(
        host: HostContext,
        base_url: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, LookupError> {
        Ok(Self {
            host,
            api: ApiClient::new(base_url, config)?,
            client: None,
            tokens: Arc::new(Vec::new()),
            pipeline: None,
            disabled: false,
        })
    }

    /// Reads the blacklist tokens, initialising the setting when absent.
    fn load_tokens(&mut self) {
        match self.host.settings.get_string_list(TOKENS_SETTING) {
            Some(tokens) if !tokens.is_empty() => {
                debug!("[{}] Using {} blacklist tokens", NAME, tokens.len());
                self.tokens = Arc::new(tokens);
            }
            _ => self.host.settings.set(TOKENS_SETTING, Value::Array(Vec::new())),
        }
    }

    fn active(&self) -> Option<(&LookupPipeline, &ApiClient)> {
        if self.disabled {
            return None;
        }
        self.pipeline.as_ref().zip(self.client.as_ref())
    }

    fn lookup(&self, worker_key: String, targets: Vec<Target>) {
        let Some((pipeline, client)) = self.active() else {
            return;
        };

        let client = client.clone();
        let tokens = self.tokens.clone();
        pipeline.dispatch(worker_key, move |sink| {
            batch::lookup(client, tokens, targets, sink)
        });
    }

    /// Looks up every named player that the host knows and that is not cached.
    fn update_blacklist(&self, names: &[String]) {
        let Some((pipeline, _)) = self.active() else {
            return;
        };

        let mut targets = BTreeMap::new();
        for name in names {
            let Some(player) = self.host.players.lookup(name) else {
                debug!("[{}] {} is not known to the host yet", NAME, name);
                continue;
            };
            let Some(key) = player.cache_key() else {
                continue;
            };
            if pipeline.cache().contains(&key) {
                continue;
            }
            targets.insert(key, (player.username, player.uuid));
        }

        if targets.is_empty() {
            return;
        }

        let worker_key = format!(
            "batch:{}",
            targets.keys().cloned().collect::<Vec<_>>().join(",")
        );
        let targets = targets
            .into_iter()
            .map(|(key, (username, row))| Target { username, key, row })
            .collect();
        self.lookup(worker_key, targets);
    }
}

#[async_trait]
impl Plugin for AntisniperPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    async fn on_load(&mut self) -> Result<(), PluginError> {
        info!("[{}] Plugin has been loaded!", NAME);

        self.load_tokens();

        let validator = UserEndpointValidator {
            client: self.api.clone(),
        };
        let state = ApiKeyBootstrap::new(KEY_SETTING, TITLE, "Antisniper")
            .run(&self.host, &validator)
            .await;

        let Some(key) = state.key() else {
            self.disabled = true;
            return Ok(());
        };

        self.client = Some(
            self.api
                .with_header(KEY_HEADER, key)
                .map_err(|e| PluginError::InitializationFailed(e.to_string()))?,
        );
        self.pipeline = Some(
            LookupPipeline::start(NAME, self.host.table.clone(), Arc::new(BlacklistAnnotator))
                .map_err(|e| PluginError::InitializationFailed(e.to_string()))?,
        );
        Ok(())
    }

    async fn on_unload(&mut self) -> Result<(), PluginError> {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown();
        }
        info!("[{}] Plugin has been unloaded!", NAME);
        Ok(())
    }

    async fn on_player_insert(&self, player: &PlayerIdentity) {
        let Some((pipeline, _)) = self.active() else {
            return;
        };

        info!(
            "[{}] Player: {} has been inserted! Looking up...",
            NAME, player.username
        );

        let Some(key) = player.cache_key() else {
            return;
        };
        if pipeline.replay(&key, &player.uuid) {
            return;
        }

        self.lookup(
            key.clone(),
            vec![Target {
                username: player.username.clone(),
                key,
                row: player.uuid.clone(),
            }],
        );
    }

    async fn on_who(&self, players: &[String]) {
        self.update_blacklist(players);
    }

    async fn on_list(&self, players: &[String]) {
        self.update_blacklist(players);
    }
}
