//! Event classification — wire action types to semantic sync actions.

use cardsync_core::config::BridgeConfig;
use cardsync_core::events::{self, Card, CheckItem, Checklist, WebhookEvent};

/// Whose checklist an event is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecklistScope {
    /// The configured master checklist.
    Master,
    /// A checklist whose name matches the tracked sub name.
    TrackedSub,
    /// Anything else; dropped without further processing.
    Unrelated,
}

/// Semantic action derived from the wire action type.
#[derive(Clone, Debug)]
pub enum SyncAction {
    CreateCheckItem {
        card: Card,
        checklist: Checklist,
        item: CheckItem,
    },
    UpdateCheckItem {
        card: Card,
        checklist: Checklist,
        item: CheckItem,
    },
    ToggleCheckItemState {
        card: Card,
        checklist: Checklist,
        item: CheckItem,
    },
    DeleteCheckItem {
        card: Card,
        checklist: Checklist,
        item: CheckItem,
    },
    RemoveChecklist {
        card: Card,
        checklist: Checklist,
    },
}

impl SyncAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateCheckItem { .. } => "create_check_item",
            Self::UpdateCheckItem { .. } => "update_check_item",
            Self::ToggleCheckItemState { .. } => "toggle_check_item_state",
            Self::DeleteCheckItem { .. } => "delete_check_item",
            Self::RemoveChecklist { .. } => "remove_checklist",
        }
    }

    pub fn checklist(&self) -> &Checklist {
        match self {
            Self::CreateCheckItem { checklist, .. }
            | Self::UpdateCheckItem { checklist, .. }
            | Self::ToggleCheckItemState { checklist, .. }
            | Self::DeleteCheckItem { checklist, .. }
            | Self::RemoveChecklist { checklist, .. } => checklist,
        }
    }

    pub fn card(&self) -> &Card {
        match self {
            Self::CreateCheckItem { card, .. }
            | Self::UpdateCheckItem { card, .. }
            | Self::ToggleCheckItemState { card, .. }
            | Self::DeleteCheckItem { card, .. }
            | Self::RemoveChecklist { card, .. } => card,
        }
    }

    /// The check item payload, for item-bearing actions.
    pub fn item(&self) -> Option<&CheckItem> {
        match self {
            Self::CreateCheckItem { item, .. }
            | Self::UpdateCheckItem { item, .. }
            | Self::ToggleCheckItemState { item, .. }
            | Self::DeleteCheckItem { item, .. } => Some(item),
            Self::RemoveChecklist { .. } => None,
        }
    }
}

/// A webhook event the engine knows how to reason about.
#[derive(Clone, Debug)]
pub struct ClassifiedEvent {
    pub scope: ChecklistScope,
    pub action: SyncAction,
}

/// Classify a raw webhook event. Side-effect free.
///
/// Returns `None` for unknown action types and for known types whose
/// payload is missing the fields that type requires — both are dropped
/// at debug level by the caller, never treated as errors.
pub fn classify(event: &WebhookEvent, config: &BridgeConfig) -> Option<ClassifiedEvent> {
    let data = &event.action.data;
    let card = data.card.clone()?;
    let checklist = data.checklist.clone()?;

    let action = match event.action_type() {
        events::CREATE_CHECK_ITEM => SyncAction::CreateCheckItem {
            card,
            checklist,
            item: data.check_item.clone()?,
        },
        events::UPDATE_CHECK_ITEM => SyncAction::UpdateCheckItem {
            card,
            checklist,
            item: data.check_item.clone()?,
        },
        events::UPDATE_CHECK_ITEM_STATE => SyncAction::ToggleCheckItemState {
            card,
            checklist,
            item: data.check_item.clone()?,
        },
        events::DELETE_CHECK_ITEM => SyncAction::DeleteCheckItem {
            card,
            checklist,
            item: data.check_item.clone()?,
        },
        events::REMOVE_CHECKLIST_FROM_CARD => SyncAction::RemoveChecklist { card, checklist },
        _ => return None,
    };

    let scope = scope_of(action.checklist(), config);
    Some(ClassifiedEvent { scope, action })
}

fn scope_of(checklist: &Checklist, config: &BridgeConfig) -> ChecklistScope {
    if config.is_master_checklist(&checklist.id) {
        ChecklistScope::Master
    } else if checklist
        .name
        .as_deref()
        .is_some_and(|name| config.is_tracked_sub_name(name))
    {
        ChecklistScope::TrackedSub
    } else {
        ChecklistScope::Unrelated
    }
}
