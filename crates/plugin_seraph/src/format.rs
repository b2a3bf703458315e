//! Seraph record to player table cell.

use lookup_core::annotation::{colours, icons, markup};
use lookup_core::record::{ANNOYLIST, BLACKLIST, NAME_CHANGE, SAFELIST, STATISTICS};
use lookup_core::{Annotation, Annotator, LookupRecord, TooltipBuilder};

/// Formats every Seraph record, tagged or not; the statistics section and the
/// encounter count are always shown.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeraphAnnotator;

impl Annotator for SeraphAnnotator {
    fn annotate(&self, record: &LookupRecord) -> Option<Annotation> {
        Some(annotate(record))
    }
}

pub fn annotate(record: &LookupRecord) -> Annotation {
    let blacklist = record.category(BLACKLIST);
    let annoylist = record.category(ANNOYLIST);
    let safelist = record.category(SAFELIST);
    let statistics = record.category(STATISTICS);

    let blacklisted = blacklist.flag("tagged");
    let annoylisted = annoylist.flag("tagged");
    let safelisted = safelist.flag("tagged");

    let mut tooltip = TooltipBuilder::new();
    if blacklisted {
        tooltip = tooltip.section(
            "Blacklisted",
            [
                markup(&blacklist.text("reason", "Unknown")),
                format!("Type: {}", title_case(&blacklist.text("report_type", "Unknown"))),
            ],
        );
    }
    if annoylisted {
        tooltip = tooltip.section("Annoylisted", [markup(&annoylist.text("tooltip", "Unknown"))]);
    }
    if safelisted {
        tooltip = tooltip.section(
            "Safelisted",
            [
                markup(&safelist.text("tooltip", "Unknown")),
                format!("Times Killed: {}", safelist.int("timesKilled")),
                format!("Security Level: {}", safelist.int("security_level")),
            ],
        );
    }

    let encounters = statistics.int("encounters");
    tooltip = tooltip.section(
        "Statistics",
        [
            format!("Encounters: {}", encounters),
            format!("Threat Level: {}", statistics.int("threat_level")),
        ],
    );

    if record.category(NAME_CHANGE).flag("changed") {
        tooltip = tooltip.section("Name Changed Recently!", Vec::<String>::new());
    }

    let (icon, colour) = if blacklisted {
        (icons::BLACKLIST, Some(colours::BLACKLIST))
    } else if annoylisted {
        (icons::ANNOYING, Some(colours::ANNOYLIST))
    } else if safelisted {
        (icons::VERIFIED, Some(colours::SAFELIST))
    } else {
        (icons::INFO, None)
    };

    Annotation {
        tooltip: tooltip.build(),
        icon: icon.to_string(),
        text: Some(thousands(encounters)),
        colour: colour.map(str::to_string),
    }
}

/// Upper-cases the first letter of every word and lower-cases the rest.
/// Any non-letter starts a new word.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> LookupRecord {
        LookupRecord::from_value(value)
    }

    #[test]
    fn test_untagged_player_shows_statistics_only() {
        let annotation = annotate(&record(json!({
            "blacklist": { "tagged": false },
            "annoylist": { "tagged": false },
            "safelist": { "tagged": false },
            "statistics": { "encounters": 1234567, "threat_level": 2 }
        })));

        assert_eq!(
            annotation.tooltip,
            "<b>Statistics</b><br>Encounters: 1234567<br>Threat Level: 2"
        );
        assert_eq!(annotation.icon, "info");
        assert_eq!(annotation.colour, None);
        assert_eq!(annotation.text.as_deref(), Some("1,234,567"));
    }

    #[test]
    fn test_blacklist_wins_over_other_lists() {
        let annotation = annotate(&record(json!({
            "blacklist": { "tagged": true, "reason": "line one\nline two", "report_type": "closet_cheating" },
            "annoylist": { "tagged": true, "tooltip": "spams" },
            "safelist": { "tagged": true, "tooltip": "friend", "timesKilled": 3, "security_level": 1 },
            "statistics": { "encounters": 5, "threat_level": 9 },
            "name_change": { "changed": true }
        })));

        assert_eq!(
            annotation.tooltip,
            "<b>Blacklisted</b><br>line one<br>line two<br>Type: Closet_Cheating<br><br>\
             <b>Annoylisted</b><br>spams<br><br>\
             <b>Safelisted</b><br>friend<br>Times Killed: 3<br>Security Level: 1<br><br>\
             <b>Statistics</b><br>Encounters: 5<br>Threat Level: 9<br><br>\
             <b>Name Changed Recently!</b>"
        );
        assert_eq!(annotation.icon, "custom-blacklist");
        assert_eq!(annotation.colour.as_deref(), Some("#FF0000"));
        assert_eq!(annotation.text.as_deref(), Some("5"));
    }

    #[test]
    fn test_annoylist_beats_safelist() {
        let annotation = annotate(&record(json!({
            "annoylist": { "tagged": true },
            "safelist": { "tagged": true }
        })));

        assert_eq!(annotation.icon, "annoying");
        assert_eq!(annotation.colour.as_deref(), Some("#FFFF00"));
        assert!(annotation.tooltip.starts_with("<b>Annoylisted</b><br>Unknown<br><br>"));
    }

    #[test]
    fn test_safelist_only() {
        let annotation = annotate(&record(json!({ "safelist": { "tagged": true, "tooltip": "ok" } })));

        assert_eq!(annotation.icon, "verified");
        assert_eq!(annotation.colour.as_deref(), Some("#00AA00"));
        assert!(annotation
            .tooltip
            .contains("Times Killed: 0<br>Security Level: 0"));
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let r = record(json!({ "blacklist": { "tagged": true }, "statistics": { "encounters": 1000 } }));
        assert_eq!(annotate(&r), annotate(&r));
        assert_eq!(annotate(&r).text.as_deref(), Some("1,000"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("SNIPING"), "Sniping");
        assert_eq!(title_case("closet cheating"), "Closet Cheating");
        assert_eq!(title_case("Unknown"), "Unknown");
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(-1234567), "-1,234,567");
    }
}
