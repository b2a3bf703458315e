//! Seraph blacklist plugin.
//!
//! Fetches each inserted player's Seraph record (blacklist, annoylist,
//! safelist, encounter statistics) and takes over the global blacklist column
//! of the player table. Final kills are reported back to the safelist.

use async_trait::async_trait;
use lookup_core::{
    AcceptNonEmpty, ApiClient, ApiKeyBootstrap, ClientConfig, LookupError, LookupPipeline,
};
use overlay_plugin_api::{HostContext, PlayerIdentity, Plugin, PluginError};
use std::sync::Arc;
use tracing::{debug, error, info};

mod format;

pub use format::{annotate, SeraphAnnotator};

pub const NAME: &str = "Seraph Blacklist Plugin";
pub const VERSION: &str = "1.0.0";
pub const DEFAULT_API: &str = "https://api.seraph.si";

/// Seraph replaces the host's own global blacklist column.
pub const OVERRIDE_GLOBAL_BLACKLIST: bool = true;

const KEY_SETTING: &str = "Seraph-APIKey";
const KEY_HEADER: &str = "seraph-api-key";

fn user_agent() -> String {
    format!("Polsu Overlay - Seraph Blacklist Plugin [{}]", VERSION)
}

pub struct SeraphPlugin {
    host: HostContext,
    api: ApiClient,
    client: Option<ApiClient>,
    pipeline: Option<LookupPipeline>,
    disabled: bool,
}

impl SeraphPlugin {
    pub fn new(
        host: HostContext,
        base_url: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, LookupError> {
        let api = ApiClient::new(base_url, config)?.with_header("User-Agent", &user_agent())?;

        Ok(Self {
            host,
            api,
            client: None,
            pipeline: None,
            disabled: false,
        })
    }

    fn active(&self) -> Option<(&LookupPipeline, &ApiClient)> {
        if self.disabled {
            return None;
        }
        self.pipeline.as_ref().zip(self.client.as_ref())
    }
}

#[async_trait]
impl Plugin for SeraphPlugin {
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
        info!("[SeraphBL] Plugin has been loaded!");

        let state = ApiKeyBootstrap::new(KEY_SETTING, NAME, "Seraph")
            .run(&self.host, &AcceptNonEmpty)
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
            LookupPipeline::start("SeraphBL", self.host.table.clone(), Arc::new(SeraphAnnotator))
                .map_err(|e| PluginError::InitializationFailed(e.to_string()))?,
        );
        Ok(())
    }

    async fn on_unload(&mut self) -> Result<(), PluginError> {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown();
        }
        info!("[SeraphBL] Plugin has been unloaded!");
        Ok(())
    }

    async fn on_player_insert(&self, player: &PlayerIdentity) {
        let Some((pipeline, client)) = self.active() else {
            return;
        };

        info!(
            "[SeraphBL] Player: {} has been inserted! Looking up...",
            player.username
        );

        let Some(key) = player.cache_key() else {
            return;
        };
        if pipeline.replay(&key, &player.uuid) {
            return;
        }

        let client = client.clone();
        let row = player.uuid.clone();
        let path = format!("/blacklist/{}", row.trim());
        pipeline.dispatch(key.clone(), move |sink| async move {
            let record = client.get_data(&path).await;
            sink.deliver(key, row, record);
        });
    }

    async fn on_final_kill(&self, username: &str) {
        let Some((pipeline, client)) = self.active() else {
            return;
        };

        info!(
            "[SeraphBL] Player: {} has been killed! Sending data...",
            username
        );

        let Some((key, uuid)) = self.host.players.lookup(username).and_then(|player| {
            let key = player.cache_key()?;
            Some((key, player.uuid))
        }) else {
            error!("[SeraphBL] Failed to get player: {}!", username);
            return;
        };

        let client = client.clone();
        let path = format!("/safelist/{}", uuid.trim());
        pipeline.dispatch(format!("safelist:{}", key), move |_| async move {
            if let Err(e) = client.get(&path).await {
                debug!("[SeraphBL] Safelist report failed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookup_core::RetryPolicy;
    use overlay_plugin_api::testing::{RecordingHost, TableUpdate};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STEVE: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";

    fn plugin(host: &Arc<RecordingHost>, server: &MockServer) -> SeraphPlugin {
        SeraphPlugin::new(
            host.context(),
            server.uri(),
            ClientConfig {
                timeout: Duration::from_secs(2),
                retry: RetryPolicy::none(),
            },
        )
        .unwrap()
    }

    async fn loaded(host: &Arc<RecordingHost>, server: &MockServer) -> SeraphPlugin {
        host.set_setting(KEY_SETTING, json!("secret"));
        let mut plugin = plugin(host, server);
        plugin.on_load().await.unwrap();
        plugin
    }

    async fn settle(plugin: &SeraphPlugin) {
        if let Some(pipeline) = &plugin.pipeline {
            pipeline.idle().await;
        }
    }

    fn blacklisted() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "blacklist": { "tagged": true, "reason": "sniping", "report_type": "sniping" },
                "statistics": { "encounters": 1500, "threat_level": 4 }
            }
        }))
    }

    #[tokio::test]
    async fn test_insert_annotates_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/blacklist/{}", STEVE)))
            .and(header("seraph-api-key", "secret"))
            .and(header("User-Agent", "Polsu Overlay - Seraph Blacklist Plugin [1.0.0]"))
            .respond_with(blacklisted())
            .expect(1)
            .mount(&server)
            .await;

        let host = RecordingHost::new();
        let plugin = loaded(&host, &server).await;
        plugin.on_player_insert(&PlayerIdentity::new("Steve", STEVE)).await;
        settle(&plugin).await;

        let updates = host.table_updates();
        assert_eq!(updates.len(), 2);
        assert!(matches!(
            &updates[0],
            TableUpdate::GlobalBlacklist { icon, text, .. }
                if icon == "custom-blacklist" && text.as_deref() == Some("1,500")
        ));
        assert_eq!(host.line_colour(STEVE).as_deref(), Some("#FF0000"));
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/blacklist/{}", STEVE)))
            .respond_with(blacklisted())
            .expect(1)
            .mount(&server)
            .await;

        let host = RecordingHost::new();
        let plugin = loaded(&host, &server).await;
        let steve = PlayerIdentity::new("Steve", STEVE);

        plugin.on_player_insert(&steve).await;
        settle(&plugin).await;
        plugin.on_player_insert(&steve).await;
        settle(&plugin).await;

        assert_eq!(host.table_updates().len(), 4);
    }

    #[tokio::test]
    async fn test_rejected_lookup_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/blacklist/{}", STEVE)))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({ "success": false, "cause": "Invalid key" })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let host = RecordingHost::new();
        let plugin = loaded(&host, &server).await;
        let steve = PlayerIdentity::new("Steve", STEVE);

        plugin.on_player_insert(&steve).await;
        settle(&plugin).await;
        plugin.on_player_insert(&steve).await;
        settle(&plugin).await;

        assert!(host.table_updates().is_empty());
    }

    #[tokio::test]
    async fn test_player_without_uuid_is_ignored() {
        let server = MockServer::start().await;
        let host = RecordingHost::new();
        let plugin = loaded(&host, &server).await;

        plugin.on_player_insert(&PlayerIdentity::new("Nick", "")).await;
        settle(&plugin).await;

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_final_kill_reports_safelist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/safelist/{}", STEVE)))
            .and(header("seraph-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let host = RecordingHost::new();
        host.add_player(PlayerIdentity::new("Steve", STEVE));
        let plugin = loaded(&host, &server).await;

        plugin.on_final_kill("steve").await;
        plugin.on_final_kill("Unknown").await;
        settle(&plugin).await;

        assert!(host.table_updates().is_empty());
    }

    #[tokio::test]
    async fn test_undashed_uuid_is_sent_and_annotated_as_given() {
        let raw = "069A79F444E94726A5BEFCA90E38AAF5";
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/blacklist/{}", raw)))
            .respond_with(blacklisted())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/safelist/{}", raw)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let host = RecordingHost::new();
        host.add_player(PlayerIdentity::new("Steve", raw));
        let plugin = loaded(&host, &server).await;

        plugin.on_player_insert(&PlayerIdentity::new("Steve", raw)).await;
        settle(&plugin).await;
        assert_eq!(host.line_colour(raw).as_deref(), Some("#FF0000"));
        assert_eq!(host.line_colour(STEVE), None);

        // cached under the normalised key, replayed onto the row asked for
        plugin.on_player_insert(&PlayerIdentity::new("Steve", STEVE)).await;
        settle(&plugin).await;
        assert_eq!(host.line_colour(STEVE).as_deref(), Some("#FF0000"));

        plugin.on_final_kill("Steve").await;
        settle(&plugin).await;
    }

    #[tokio::test]
    async fn test_prompted_key_is_used_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/blacklist/{}", STEVE)))
            .and(header("seraph-api-key", "typed"))
            .respond_with(blacklisted())
            .expect(1)
            .mount(&server)
            .await;

        let host = RecordingHost::new();
        host.answer_prompt("typed");
        let mut plugin = plugin(&host, &server);
        plugin.on_load().await.unwrap();

        assert_eq!(host.prompts()[0].1, "Please enter your Seraph API Key:");
        assert!(host.notifications().is_empty());
        assert_eq!(host.setting(KEY_SETTING), Some(json!("typed")));

        plugin.on_player_insert(&PlayerIdentity::new("Steve", STEVE)).await;
        settle(&plugin).await;
        assert_eq!(host.line_colour(STEVE).as_deref(), Some("#FF0000"));
    }

    #[tokio::test]
    async fn test_empty_prompt_disables() {
        let server = MockServer::start().await;
        let host = RecordingHost::new();

        let mut plugin = plugin(&host, &server);
        plugin.on_load().await.unwrap();
        plugin.on_player_insert(&PlayerIdentity::new("Steve", STEVE)).await;
        plugin.on_final_kill("Steve").await;

        assert!(plugin.is_disabled());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
