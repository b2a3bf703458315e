//! Batched `POST /v2/blacklist` lookups.
//!
//! The blacklist endpoint accepts at most 20 shared tokens per request, so a
//! lookup fans out into one request per token chunk plus one request against
//! the public list. All of them run at once; a player counts as blacklisted
//! as soon as any one of them says so.

use futures::stream::{FuturesUnordered, StreamExt};
use lookup_core::client::require_success;
use lookup_core::{ApiClient, DeliverySink, LookupRecord};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

pub(crate) const BLACKLIST_PATH: &str = "/v2/blacklist";

/// Maximum number of tokens sent in one request.
pub(crate) const TOKEN_CHUNK: usize = 20;

/// A player to look up: the name the API knows, the cache key results are
/// stored under and the host's UUID the table row is addressed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub username: String,
    pub key: String,
    pub row: String,
}

/// Request bodies for one lookup: every token chunk, then the public list.
pub(crate) fn request_bodies(players: &[String], tokens: &[String]) -> Vec<Value> {
    let mut bodies: Vec<Value> = tokens
        .chunks(TOKEN_CHUNK)
        .map(|chunk| json!({ "players": players, "tokens": chunk }))
        .collect();
    bodies.push(json!({ "players": players }));
    bodies
}

/// Looks `targets` up and delivers exactly one record per player that any
/// request returned.
///
/// A blacklisted entry is delivered the moment it arrives. Clean entries are
/// held back and only delivered once every request finished without
/// blacklisting that player.
pub(crate) async fn lookup(
    client: ApiClient,
    tokens: Arc<Vec<String>>,
    targets: Vec<Target>,
    sink: DeliverySink,
) {
    let players: Vec<String> = targets.iter().map(|t| t.username.clone()).collect();
    let by_name: HashMap<String, Target> = targets
        .into_iter()
        .map(|t| (t.username.to_lowercase(), t))
        .collect();

    let mut requests: FuturesUnordered<_> = request_bodies(&players, &tokens)
        .into_iter()
        .map(|body| {
            let client = client.clone();
            async move { client.post(BLACKLIST_PATH, &body).await.and_then(require_success) }
        })
        .collect();

    let mut delivered: HashSet<String> = HashSet::new();
    let mut held: HashMap<String, (&Target, LookupRecord)> = HashMap::new();

    while let Some(result) = requests.next().await {
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                debug!("[AntisniperBL] Blacklist request yielded no data: {}", e);
                continue;
            }
        };

        let Some(entries) = body.get("data").and_then(Value::as_array) else {
            continue;
        };

        for entry in entries {
            let Some(ign) = entry.get("ign").and_then(Value::as_str) else {
                continue;
            };
            let Some(target) = by_name.get(&ign.to_lowercase()) else {
                trace!("[AntisniperBL] Ignoring unrequested player {}", ign);
                continue;
            };
            if delivered.contains(&target.key) {
                continue;
            }

            let record = LookupRecord::from_value(entry.clone());
            if record.root().flag("blacklisted") {
                held.remove(&target.key);
                delivered.insert(target.key.clone());
                sink.deliver(target.key.clone(), target.row.clone(), record);
            } else {
                held.entry(target.key.clone()).or_insert((target, record));
            }
        }
    }

    for (key, (target, record)) in held {
        sink.deliver(key, target.row.clone(), record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_chunked_by_twenty() {
        let players = vec!["Steve".to_string()];
        let tokens: Vec<String> = (0..45).map(|i| format!("t{}", i)).collect();

        let bodies = request_bodies(&players, &tokens);

        assert_eq!(bodies.len(), 4);
        assert_eq!(bodies[0]["tokens"].as_array().unwrap().len(), 20);
        assert_eq!(bodies[1]["tokens"].as_array().unwrap().len(), 20);
        assert_eq!(bodies[2]["tokens"].as_array().unwrap().len(), 5);
        assert_eq!(bodies[3], json!({ "players": ["Steve"] }));
    }

    #[test]
    fn test_no_tokens_means_public_list_only() {
        let players = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            request_bodies(&players, &[]),
            vec![json!({ "players": ["a", "b"] })]
        );
    }
}
