//! Recording mock for deterministic engine and server tests without a
//! Trello account.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use cardsync_core::client::{Position, TrackingClient};
use cardsync_core::errors::RemoteError;
use cardsync_core::events::CheckItem;

/// One call the engine issued against the mock, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum MockCall {
    Create {
        checklist_id: String,
        name: String,
        checked: bool,
        position: Position,
    },
    List {
        checklist_id: String,
    },
    UpdateState {
        card_id: String,
        item_id: String,
        checked: bool,
    },
    Delete {
        checklist_id: String,
        item_id: String,
    },
}

/// Mock tracking client with a programmable master-item list.
///
/// Mutations are reflected in the held list so multi-step transitions
/// (list, then delete) see consistent state within one event.
#[derive(Default)]
pub struct MockTrackingClient {
    items: Mutex<Vec<CheckItem>>,
    calls: Mutex<Vec<MockCall>>,
    failure: Mutex<Option<RemoteError>>,
    created: AtomicUsize,
}

impl MockTrackingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the checklist the mock serves from `list_check_items`.
    pub fn with_items(items: Vec<CheckItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with the given error.
    pub fn fail_with(&self, err: RemoteError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Current item list, after whatever mutations the engine applied.
    pub fn items(&self) -> Vec<CheckItem> {
        self.items.lock().unwrap().clone()
    }

    fn record(&self, call: MockCall) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        match &*self.failure.lock().unwrap() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TrackingClient for MockTrackingClient {
    async fn create_check_item(
        &self,
        checklist_id: &str,
        name: &str,
        checked: bool,
        position: Position,
    ) -> Result<CheckItem, RemoteError> {
        self.record(MockCall::Create {
            checklist_id: checklist_id.to_string(),
            name: name.to_string(),
            checked,
            position,
        })?;

        let n = self.created.fetch_add(1, Ordering::Relaxed);
        let item = CheckItem::new(format!("mock_item_{n}"), name, checked);
        self.items.lock().unwrap().push(item.clone());
        Ok(item)
    }

    async fn list_check_items(&self, checklist_id: &str) -> Result<Vec<CheckItem>, RemoteError> {
        self.record(MockCall::List {
            checklist_id: checklist_id.to_string(),
        })?;
        Ok(self.items())
    }

    async fn update_check_item_state(
        &self,
        card_id: &str,
        item_id: &str,
        checked: bool,
    ) -> Result<(), RemoteError> {
        self.record(MockCall::UpdateState {
            card_id: card_id.to_string(),
            item_id: item_id.to_string(),
            checked,
        })?;

        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|i| i.id == item_id) {
            item.state = Some(cardsync_core::events::CheckItemState::from_checked(checked));
        }
        Ok(())
    }

    async fn delete_check_item(
        &self,
        checklist_id: &str,
        item_id: &str,
    ) -> Result<(), RemoteError> {
        self.record(MockCall::Delete {
            checklist_id: checklist_id.to_string(),
            item_id: item_id.to_string(),
        })?;

        self.items.lock().unwrap().retain(|i| i.id != item_id);
        Ok(())
    }
}
