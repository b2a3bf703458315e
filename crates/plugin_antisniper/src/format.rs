use chrono::{Local, TimeZone};
use lookup_core::annotation::{colours, icons, markup};
use lookup_core::{Annotation, Annotator, Category, LookupRecord};
use serde_json::Value;

/// Marks blacklisted players. Clean players are left untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlacklistAnnotator;

impl Annotator for BlacklistAnnotator {
    fn annotate(&self, record: &LookupRecord) -> Option<Annotation> {
        let entry = record.root();
        if !entry.flag("blacklisted") {
            return None;
        }

        Some(Annotation {
            tooltip: tooltip(&entry),
            icon: icons::BLACKLIST.to_string(),
            text: None,
            colour: Some(colours::BLACKLIST.to_string()),
        })
    }
}

fn tooltip(entry: &Category<'_>) -> String {
    let reasons = entry
        .strings("reasons")
        .unwrap_or_else(|| vec!["Unknown".to_string()]);

    let mut tooltip = String::from("<b>Blacklisted</b><br>");
    if reasons.is_empty() {
        tooltip.push_str("Unknown reason<br>");
    } else {
        tooltip.push_str("<b>Reasons</b><br>");
    }
    for reason in &reasons {
        tooltip.push_str(&markup(reason));
        tooltip.push_str("<br>");
    }

    tooltip.push_str("Added: ");
    tooltip.push_str(&added(entry.get("added")));
    tooltip
}

/// Local date and time of a unix timestamp in seconds.
fn added(timestamp: Option<&Value>) -> String {
    timestamp
        .and_then(Value::as_f64)
        .and_then(|secs| Local.timestamp_opt(secs as i64, 0).single())
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
