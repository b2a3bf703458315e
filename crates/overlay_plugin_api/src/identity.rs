use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A player as the host knows it.
///
/// The host fills in the UUID once it has resolved the player; until then it
/// is an empty string. Plugins never mutate an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub username: String,
    #[serde(default)]
    pub uuid: String,
}

impl PlayerIdentity {
    pub fn new(username: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            uuid: uuid.into(),
        }
    }

    /// Whether the host has resolved a UUID for this player.
    pub fn has_uuid(&self) -> bool {
        !self.uuid.trim().is_empty()
    }

    /// Canonical key used to index lookup caches.
    ///
    /// UUIDs are normalised to their lowercase hyphenated form so that the
    /// dashed and undashed spellings the host may report hit the same entry.
    /// Returns `None` when no UUID is known.
    pub fn cache_key(&self) -> Option<String> {
        let raw = self.uuid.trim();
        if raw.is_empty() {
            return None;
        }

        match Uuid::try_parse(raw) {
            Ok(uuid) => Some(uuid.hyphenated().to_string()),
            Err(_) => Some(raw.to_lowercase()),
        }
    }
}

impl std::fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_uuid() {
            write!(f, "{} ({})", self.username, self.uuid)
        } else {
            write!(f, "{}", self.username)
        }
    }
}
