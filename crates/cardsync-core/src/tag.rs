//! Origin tags — the loop-breaking mechanism.
//!
//! Every item the engine mirrors into the master checklist carries a
//! trailing marker identifying the sub item it came from:
//!
//! ```text
//! Buy milk https://trello.com/c/abc123 [src:abc123|S1|I1]
//! ```
//!
//! The link is for humans; the bracketed marker is for the engine. When
//! a master-side event arrives, a successful decode means the event is
//! an echo of the engine's own write. A failed decode means the item was
//! authored by a human and must never be touched.

use std::sync::LazyLock;

use regex::Regex;

const CARD_URL_BASE: &str = "https://trello.com/c";

// Trello ids and short links are URL-safe; anchoring at the end of the
// text keeps item names containing `|` or `[` from false-positive matches.
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[src:([A-Za-z0-9_-]+)\|([A-Za-z0-9_-]+)\|([A-Za-z0-9_-]+)\]\s*$")
        .expect("origin tag marker regex is valid")
});

/// Back-reference from a mirrored master item to its sub item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginTag {
    pub card_short_link: String,
    pub checklist_id: String,
    pub item_id: String,
}

impl OriginTag {
    pub fn new(
        card_short_link: impl Into<String>,
        checklist_id: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Self {
        Self {
            card_short_link: card_short_link.into(),
            checklist_id: checklist_id.into(),
            item_id: item_id.into(),
        }
    }

    /// Link to the sub card, for navigating from the master item.
    pub fn card_url(&self) -> String {
        format!("{CARD_URL_BASE}/{}", self.card_short_link)
    }

    /// Render the suffix appended to a mirrored item name: the card link
    /// followed by the machine-parseable marker.
    pub fn encode(&self) -> String {
        format!(
            "{} [src:{}|{}|{}]",
            self.card_url(),
            self.card_short_link,
            self.checklist_id,
            self.item_id
        )
    }

    /// Full mirrored item name for the master checklist.
    pub fn mirrored_name(&self, item_name: &str) -> String {
        format!("{item_name} {}", self.encode())
    }

    /// Extract the origin tag from a master item's text, if any.
    ///
    /// Total over arbitrary input: human-authored items and malformed
    /// markers yield `None`, never an error.
    pub fn decode(text: &str) -> Option<Self> {
        let caps = MARKER_RE.captures(text)?;
        Some(Self::new(&caps[1], &caps[2], &caps[3]))
    }

    /// Whether this tag points at the given sub item.
    pub fn refers_to(&self, checklist_id: &str, item_id: &str) -> bool {
        self.checklist_id == checklist_id && self.item_id == item_id
    }
}
