use serde::{Deserialize, Serialize};

/// Action type strings Trello puts on the wire.
pub const CREATE_CHECK_ITEM: &str = "createCheckItem";
pub const UPDATE_CHECK_ITEM: &str = "updateCheckItem";
pub const DELETE_CHECK_ITEM: &str = "deleteCheckItem";
pub const UPDATE_CHECK_ITEM_STATE: &str = "updateCheckItemState";
pub const REMOVE_CHECKLIST_FROM_CARD: &str = "removeChecklistFromCard";

/// One webhook callback payload from the tracking service.
///
/// Trello sends a lot more than this (`model`, member info, limits);
/// everything the bridge does not read is ignored on deserialization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub action: Action,
}

impl WebhookEvent {
    pub fn action_type(&self) -> &str {
        &self.action.kind
    }
}

/// The `action` object inside a webhook payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    /// Wire action type, e.g. `createCheckItem`. Kept as raw text so
    /// unknown types can be logged and dropped instead of failing to parse.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: ActionData,
}

/// The `action.data` object. Which fields Trello populates depends on
/// the action type, so everything is optional here and the classifier
/// decides what a given action actually requires.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Checklist>,
    #[serde(rename = "checkItem", default, skip_serializing_if = "Option::is_none")]
    pub check_item: Option<CheckItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "shortLink", default, skip_serializing_if = "Option::is_none")]
    pub short_link: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checklist {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A check item, both as it appears in webhook payloads and as the
/// Trello REST API returns it from checklist listings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<CheckItemState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<f64>,
}

impl CheckItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, checked: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: Some(CheckItemState::from_checked(checked)),
            pos: None,
        }
    }

    /// Checked flag; an absent state reads as unchecked.
    pub fn is_checked(&self) -> bool {
        self.state.map(CheckItemState::is_checked).unwrap_or(false)
    }
}

/// Trello's wire encoding of the checked flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckItemState {
    Complete,
    Incomplete,
}

impl CheckItemState {
    pub fn is_checked(self) -> bool {
        matches!(self, Self::Complete)
    }

    pub fn from_checked(checked: bool) -> Self {
        if checked {
            Self::Complete
        } else {
            Self::Incomplete
        }
    }
}
