//! Seam between the reconciliation engine and the tracking service.
//!
//! The engine owns no checklist state; every read and write goes through
//! this trait. Production is backed by the Trello REST API, tests by a
//! recording mock.

use async_trait::async_trait;

use crate::errors::RemoteError;
use crate::events::CheckItem;

/// Where a created check item lands in its checklist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Top,
    Bottom,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

#[async_trait]
pub trait TrackingClient: Send + Sync {
    /// Create a check item on the given checklist.
    async fn create_check_item(
        &self,
        checklist_id: &str,
        name: &str,
        checked: bool,
        position: Position,
    ) -> Result<CheckItem, RemoteError>;

    /// List all check items currently on the given checklist.
    async fn list_check_items(&self, checklist_id: &str) -> Result<Vec<CheckItem>, RemoteError>;

    /// Set the checked state of an item. Trello routes this through the
    /// owning card rather than the checklist.
    async fn update_check_item_state(
        &self,
        card_id: &str,
        item_id: &str,
        checked: bool,
    ) -> Result<(), RemoteError>;

    /// Delete a check item from the given checklist.
    async fn delete_check_item(&self, checklist_id: &str, item_id: &str)
        -> Result<(), RemoteError>;
}
