//! Loop guard — echo suppression.
//!
//! The engine's own writes to the master checklist come back as webhook
//! events. Without suppression that closes a cycle: sub change, master
//! mutation, master event, reinterpreted as a new change, sub mutation,
//! and so on. Recognition is stateless: every engine-authored master
//! item carries an origin tag, so an inbound master event either decodes
//! a tag (it is our own echo) or it does not (a human wrote the item and
//! we must not touch it). Either way, nothing propagates.

use cardsync_core::config::BridgeConfig;
use cardsync_core::tag::OriginTag;

use crate::classify::{ChecklistScope, ClassifiedEvent, SyncAction};

/// Why an event was suppressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suppression {
    /// Master-side echo of a mutation the engine itself performed.
    EchoOfOwnWrite,
    /// Master item with no decodable tag: human-authored, never touched.
    ForeignMasterItem,
    /// Checklist removal on the master card must never cascade.
    MasterChecklistRemoval,
}

impl Suppression {
    pub fn reason(self) -> &'static str {
        match self {
            Self::EchoOfOwnWrite => "echo_of_own_write",
            Self::ForeignMasterItem => "foreign_master_item",
            Self::MasterChecklistRemoval => "master_checklist_removal",
        }
    }
}

/// Decide whether a classified event is an echo or otherwise forbidden.
/// Rules are evaluated in order; first match wins. `None` means the
/// event is a genuine change requiring propagation.
pub fn evaluate(event: &ClassifiedEvent, config: &BridgeConfig) -> Option<Suppression> {
    // Rule 1: master-side create/toggle/delete whose item decodes a tag
    // is the echo of our own write.
    if event.scope == ChecklistScope::Master {
        if let SyncAction::CreateCheckItem { item, .. }
        | SyncAction::ToggleCheckItemState { item, .. }
        | SyncAction::DeleteCheckItem { item, .. } = &event.action
        {
            if OriginTag::decode(&item.name).is_some() {
                return Some(Suppression::EchoOfOwnWrite);
            }
        }

        // Rule 2: any master item without a decodable tag is foreign.
        if let Some(item) = event.action.item() {
            if OriginTag::decode(&item.name).is_none() {
                return Some(Suppression::ForeignMasterItem);
            }
        }
    }

    // Rule 3: removing a checklist on the master card never cascades,
    // even when the checklist's name matches the tracked sub name.
    if event.scope == ChecklistScope::TrackedSub {
        if let SyncAction::RemoveChecklist { card, .. } = &event.action {
            if config.is_master_card(&card.id) {
                return Some(Suppression::MasterChecklistRemoval);
            }
        }
    }

    // Rule 4: genuine sub-originated change, or sub checklist removal
    // needing master-side cleanup.
    None
}
