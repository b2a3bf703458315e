//! API key resolution run once when a plugin loads.

use async_trait::async_trait;
use overlay_plugin_api::HostContext;
use serde_json::Value;
use tracing::{debug, info, warn};

const INVALID_STORED_KEY: &str = "API key is invalid. Please enter a working one.";
const NO_KEY_ENTERED: &str =
    "You have not entered an API key. Therefore, the plugin was disabled.";
const INVALID_ENTERED_KEY: &str = "API key is invalid. Therefore, the plugin was disabled.";
const VALID_KEY: &str = "API key is valid!";

/// Where key resolution ended up.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyState {
    NoKey,
    AwaitingInput,
    Valid(String),
    Invalid,
}

impl KeyState {
    pub fn key(&self) -> Option<&str> {
        match self {
            KeyState::Valid(key) => Some(key),
            _ => None,
        }
    }
}

impl std::fmt::Debug for KeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyState::NoKey => f.write_str("NoKey"),
            KeyState::AwaitingInput => f.write_str("AwaitingInput"),
            KeyState::Valid(_) => f.write_str("Valid(<redacted>)"),
            KeyState::Invalid => f.write_str("Invalid"),
        }
    }
}

/// Decides whether a key is usable.
#[async_trait]
pub trait KeyValidator: Send + Sync {
    async fn validate(&self, key: &str) -> bool;

    /// Whether `validate` actually asks the remote service. Only then is the
    /// user told that the key is valid.
    fn performs_check(&self) -> bool {
        true
    }
}

/// Accepts any non-empty key without asking anyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptNonEmpty;

#[async_trait]
impl KeyValidator for AcceptNonEmpty {
    async fn validate(&self, key: &str) -> bool {
        !key.trim().is_empty()
    }

    fn performs_check(&self) -> bool {
        false
    }
}

/// Resolves a plugin's API key from settings, prompting the user when needed.
#[derive(Debug, Clone)]
pub struct ApiKeyBootstrap {
    /// Settings name, e.g. `Antisniper-APIKey`
    pub setting: String,
    /// Title used for prompts and notifications
    pub title: String,
    /// Service name shown in the prompt
    pub service: String,
}

impl ApiKeyBootstrap {
    pub fn new(
        setting: impl Into<String>,
        title: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            setting: setting.into(),
            title: title.into(),
            service: service.into(),
        }
    }

    /// Runs the key state machine to a terminal state: `Valid` or `Invalid`.
    ///
    /// Prompting goes through [`OverlayWindow::ask`], which blocks until the
    /// user answers.
    ///
    /// [`OverlayWindow::ask`]: overlay_plugin_api::OverlayWindow::ask
    pub async fn run(&self, host: &HostContext, validator: &dyn KeyValidator) -> KeyState {
        let mut state = match host.settings.get_string(&self.setting) {
            Some(key) => {
                if validator.validate(&key).await {
                    debug!("[{}] Stored API key accepted", self.title);
                    KeyState::Valid(key)
                } else {
                    warn!("[{}] Stored API key was rejected", self.title);
                    host.notification.send(&self.title, INVALID_STORED_KEY);
                    KeyState::AwaitingInput
                }
            }
            None => KeyState::NoKey,
        };

        loop {
            state = match state {
                KeyState::NoKey => KeyState::AwaitingInput,
                KeyState::AwaitingInput => self.prompt(host, validator).await,
                terminal => return terminal,
            };
        }
    }

    async fn prompt(&self, host: &HostContext, validator: &dyn KeyValidator) -> KeyState {
        let message = format!("Please enter your {} API Key:", self.service);
        let key = host.window.ask(&self.title, &message).trim().to_string();

        if key.is_empty() {
            info!("[{}] No API key entered, disabling", self.title);
            host.notification.send(&self.title, NO_KEY_ENTERED);
            return KeyState::Invalid;
        }

        if !validator.validate(&key).await {
            warn!("[{}] Entered API key was rejected, disabling", self.title);
            host.notification.send(&self.title, INVALID_ENTERED_KEY);
            return KeyState::Invalid;
        }

        if validator.performs_check() {
            host.notification.send(&self.title, VALID_KEY);
        }
        host.settings.set(&self.setting, Value::String(key.clone()));
        KeyState::Valid(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_plugin_api::testing::RecordingHost;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts exactly one key and counts how often it was asked.
    struct OnlyKey {
        accepted: &'static str,
        calls: AtomicUsize,
    }

    impl OnlyKey {
        fn new(accepted: &'static str) -> Self {
            Self {
                accepted,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl KeyValidator for OnlyKey {
        async fn validate(&self, key: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            key == self.accepted
        }
    }

    fn bootstrap() -> ApiKeyBootstrap {
        ApiKeyBootstrap::new("Test-APIKey", "TestBL", "Test")
    }

    #[tokio::test]
    async fn test_valid_stored_key_skips_prompt() {
        let host = RecordingHost::new();
        host.set_setting("Test-APIKey", json!("good"));
        let validator = OnlyKey::new("good");

        let state = bootstrap().run(&host.context(), &validator).await;

        assert_eq!(state, KeyState::Valid("good".into()));
        assert!(host.prompts().is_empty());
        assert!(host.notifications().is_empty());
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_key_prompts_and_persists() {
        let host = RecordingHost::new();
        host.answer_prompt("  good ");
        let validator = OnlyKey::new("good");

        let state = bootstrap().run(&host.context(), &validator).await;

        assert_eq!(state.key(), Some("good"));
        assert_eq!(
            host.prompts(),
            vec![("TestBL".to_string(), "Please enter your Test API Key:".to_string())]
        );
        assert_eq!(
            host.notifications(),
            vec![("TestBL".to_string(), VALID_KEY.to_string())]
        );
        assert_eq!(host.setting("Test-APIKey"), Some(json!("good")));
    }

    #[tokio::test]
    async fn test_empty_answer_disables() {
        let host = RecordingHost::new();
        let validator = OnlyKey::new("good");

        let state = bootstrap().run(&host.context(), &validator).await;

        assert_eq!(state, KeyState::Invalid);
        assert_eq!(host.notifications()[0].1, NO_KEY_ENTERED);
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(host.setting("Test-APIKey"), None);
    }

    #[tokio::test]
    async fn test_invalid_stored_key_reprompts_with_new_key() {
        let host = RecordingHost::new();
        host.set_setting("Test-APIKey", json!("stale"));
        host.answer_prompt("good");
        let validator = OnlyKey::new("good");

        let state = bootstrap().run(&host.context(), &validator).await;

        assert_eq!(state.key(), Some("good"));
        let notes: Vec<String> = host.notifications().into_iter().map(|(_, m)| m).collect();
        assert_eq!(notes, vec![INVALID_STORED_KEY.to_string(), VALID_KEY.to_string()]);
        assert_eq!(host.setting("Test-APIKey"), Some(json!("good")));
    }

    #[tokio::test]
    async fn test_invalid_entered_key_disables() {
        let host = RecordingHost::new();
        host.answer_prompt("wrong");
        let validator = OnlyKey::new("good");

        let state = bootstrap().run(&host.context(), &validator).await;

        assert_eq!(state, KeyState::Invalid);
        assert_eq!(host.notifications()[0].1, INVALID_ENTERED_KEY);
        assert_eq!(host.setting("Test-APIKey"), None);
    }

    #[tokio::test]
    async fn test_accept_non_empty_stays_quiet() {
        let host = RecordingHost::new();
        host.answer_prompt("anything");

        let state = bootstrap().run(&host.context(), &AcceptNonEmpty).await;

        assert_eq!(state.key(), Some("anything"));
        assert!(host.notifications().is_empty());
    }

    #[test]
    fn test_debug_redacts_key() {
        let shown = format!("{:?}", KeyState::Valid("secret".into()));
        assert!(!shown.contains("secret"));
    }
}
