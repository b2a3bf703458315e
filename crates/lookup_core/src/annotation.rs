//! What a lookup result looks like in the player table.

use overlay_plugin_api::PlayerTable;

pub mod colours {
    pub const BLACKLIST: &str = "#FF0000";
    pub const ANNOYLIST: &str = "#FFFF00";
    pub const SAFELIST: &str = "#00AA00";
}

pub mod icons {
    pub const BLACKLIST: &str = "custom-blacklist";
    pub const ANNOYING: &str = "annoying";
    pub const VERIFIED: &str = "verified";
    pub const INFO: &str = "info";
}

/// A formatted table cell plus optional row colour for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub tooltip: String,
    pub icon: String,
    pub text: Option<String>,
    pub colour: Option<String>,
}

impl Annotation {
    /// Writes the cell, then the row colour if there is one.
    pub fn apply(&self, table: &dyn PlayerTable, uuid: &str) {
        table.set_global_blacklist(uuid, &self.tooltip, &self.icon, self.text.as_deref());
        if let Some(colour) = &self.colour {
            table.set_line_colour(uuid, colour);
        }
    }
}

/// Builds tooltip markup out of bold-headed sections.
///
/// Lines inside a section are separated by `<br>`, sections by a blank line.
#[derive(Debug, Default)]
pub struct TooltipBuilder {
    sections: Vec<String>,
}

impl TooltipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section<I, S>(mut self, heading: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut section = format!("<b>{}</b>", heading);
        for line in lines {
            section.push_str("<br>");
            section.push_str(line.as_ref());
        }
        self.sections.push(section);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn build(self) -> String {
        self.sections.join("<br><br>")
    }
}

/// Converts free text from the API into tooltip markup.
pub fn markup(text: &str) -> String {
    text.replace('\n', "<br>")
}
