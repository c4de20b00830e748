//! Reconciler — the sub→master state machine.
//!
//! Each webhook event is classified, checked against the loop guard, and
//! then mapped to at most one mutation of the opposite side. The master
//! checklist is a passive mirror: all authorship flows sub→master, and
//! master-side state is re-read from the tracking service per event
//! rather than cached.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use cardsync_core::client::{Position, TrackingClient};
use cardsync_core::config::BridgeConfig;
use cardsync_core::errors::ReconcileError;
use cardsync_core::events::{Card, CheckItem, Checklist, WebhookEvent};
use cardsync_core::tag::OriginTag;

use crate::classify::{classify, ChecklistScope, SyncAction};
use crate::guard;

pub struct Reconciler {
    client: Arc<dyn TrackingClient>,
    config: Arc<BridgeConfig>,
    // Serializes events touching the same checklist. Two concurrent
    // creates on one sub checklist would otherwise both read "no match
    // yet" and both mirror.
    checklist_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Reconciler {
    pub fn new(client: Arc<dyn TrackingClient>, config: Arc<BridgeConfig>) -> Self {
        Self {
            client,
            config,
            checklist_locks: DashMap::new(),
        }
    }

    /// Single entry point for the webhook layer. Internal failures abort
    /// only this event; the caller logs them and acknowledges the
    /// webhook regardless, so the tracking service never retries.
    #[tracing::instrument(skip_all, fields(action = %event.action_type()))]
    pub async fn handle_change_event(&self, event: &WebhookEvent) -> Result<(), ReconcileError> {
        let Some(classified) = classify(event, &self.config) else {
            tracing::debug!("unclassified event dropped");
            return Ok(());
        };

        if classified.scope == ChecklistScope::Unrelated {
            tracing::debug!(
                checklist_id = %classified.action.checklist().id,
                "event for unrelated checklist dropped"
            );
            return Ok(());
        }

        if let Some(suppression) = guard::evaluate(&classified, &self.config) {
            tracing::debug!(reason = suppression.reason(), "event suppressed");
            return Ok(());
        }

        if classified.scope == ChecklistScope::Master {
            // Master→sub propagation is deliberately absent; the master
            // is a passive mirror of sub-authored content.
            tracing::debug!("master-origin event ignored");
            return Ok(());
        }

        let _serialized = self.lock_checklist(&classified.action.checklist().id).await;

        match &classified.action {
            SyncAction::CreateCheckItem {
                card,
                checklist,
                item,
            } => self.mirror_create(card, checklist, item).await,
            SyncAction::ToggleCheckItemState {
                checklist, item, ..
            } => self.mirror_toggle(checklist, item).await,
            SyncAction::DeleteCheckItem {
                checklist, item, ..
            } => self.mirror_delete(checklist, item).await,
            SyncAction::RemoveChecklist { card, checklist } => {
                self.cleanup_removed_checklist(card, checklist).await
            }
            SyncAction::UpdateCheckItem { .. } => {
                // Renames are not mirrored; the master item keeps the
                // name it was created with.
                tracing::debug!("sub item rename not mirrored");
                Ok(())
            }
        }
    }

    async fn lock_checklist(&self, checklist_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .checklist_locks
            .entry(checklist_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Sub item created: mirror it to the top of the master checklist,
    /// unchecked, carrying the origin tag that marks it as ours.
    async fn mirror_create(
        &self,
        card: &Card,
        checklist: &Checklist,
        item: &CheckItem,
    ) -> Result<(), ReconcileError> {
        let Some(short_link) = card.short_link.as_deref() else {
            tracing::warn!(card_id = %card.id, "create event without card short link, skipping");
            return Ok(());
        };

        let tag = OriginTag::new(short_link, &checklist.id, &item.id);
        let name = tag.mirrored_name(&item.name);

        let created = self
            .client
            .create_check_item(&self.config.master_checklist_id, &name, false, Position::Top)
            .await?;

        tracing::info!(
            sub_item_id = %item.id,
            master_item_id = %created.id,
            "mirrored sub item to master"
        );
        Ok(())
    }

    /// Sub item checked/unchecked: bring the mirrored master item to the
    /// same state. Already-matching state is a no-op, so redelivery of
    /// the same event converges instead of flapping.
    async fn mirror_toggle(
        &self,
        checklist: &Checklist,
        item: &CheckItem,
    ) -> Result<(), ReconcileError> {
        let desired = item.is_checked();

        let Some(master_item) = self.find_mirror(&checklist.id, &item.id).await? else {
            tracing::debug!(sub_item_id = %item.id, "no mirrored master item for toggle");
            return Ok(());
        };

        if master_item.is_checked() == desired {
            tracing::debug!(master_item_id = %master_item.id, "master item already in target state");
            return Ok(());
        }

        self.client
            .update_check_item_state(&self.config.master_card_id, &master_item.id, desired)
            .await?;

        tracing::info!(master_item_id = %master_item.id, checked = desired, "toggled master item");
        Ok(())
    }

    /// Sub item deleted: delete the mirrored master item. No match means
    /// already reconciled or never mirrored; not an error.
    async fn mirror_delete(
        &self,
        checklist: &Checklist,
        item: &CheckItem,
    ) -> Result<(), ReconcileError> {
        let Some(master_item) = self.find_mirror(&checklist.id, &item.id).await? else {
            tracing::debug!(sub_item_id = %item.id, "no mirrored master item for delete");
            return Ok(());
        };

        self.client
            .delete_check_item(&self.config.master_checklist_id, &master_item.id)
            .await?;

        tracing::info!(master_item_id = %master_item.id, "deleted mirrored master item");
        Ok(())
    }

    /// A whole sub checklist disappeared: delete every master item whose
    /// tag points into it.
    async fn cleanup_removed_checklist(
        &self,
        card: &Card,
        checklist: &Checklist,
    ) -> Result<(), ReconcileError> {
        if self.config.is_master_card(&card.id) {
            // Guard rule already catches this; kept here so the cleanup
            // can never cascade even if called directly.
            tracing::debug!("checklist removal on master card ignored");
            return Ok(());
        }

        let items = self
            .client
            .list_check_items(&self.config.master_checklist_id)
            .await?;

        let mut deleted = 0usize;
        for master_item in items {
            let Some(tag) = OriginTag::decode(&master_item.name) else {
                continue;
            };
            if tag.checklist_id != checklist.id {
                continue;
            }
            self.client
                .delete_check_item(&self.config.master_checklist_id, &master_item.id)
                .await?;
            deleted += 1;
        }

        tracing::info!(checklist_id = %checklist.id, deleted, "cleaned up removed sub checklist");
        Ok(())
    }

    /// Best-effort read of master state: the master item whose tag
    /// points at the given sub item, if any.
    async fn find_mirror(
        &self,
        checklist_id: &str,
        item_id: &str,
    ) -> Result<Option<CheckItem>, ReconcileError> {
        let items = self
            .client
            .list_check_items(&self.config.master_checklist_id)
            .await?;

        Ok(items.into_iter().find(|master_item| {
            OriginTag::decode(&master_item.name)
                .is_some_and(|tag| tag.refers_to(checklist_id, item_id))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardsync_core::config::*;
    use cardsync_core::errors::RemoteError;
    use cardsync_trello::{MockCall, MockTrackingClient};

    fn test_config() -> Arc<BridgeConfig> {
        Arc::new(
            BridgeConfig::from_lookup(|key| match key {
                ENV_MASTER_CHECKLIST_ID => Some("M1".into()),
                ENV_MASTER_CARD_ID => Some("MC1".into()),
                ENV_SUB_CHECKLIST_NAME => Some("Shopping".into()),
                ENV_TRELLO_API_KEY => Some("k".into()),
                ENV_TRELLO_API_TOKEN => Some("t".into()),
                _ => None,
            })
            .unwrap(),
        )
    }

    fn reconciler(mock: Arc<MockTrackingClient>) -> Reconciler {
        Reconciler::new(mock, test_config())
    }

    fn event(json: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(json).unwrap()
    }

    fn sub_create_event() -> WebhookEvent {
        event(serde_json::json!({
            "action": {
                "type": "createCheckItem",
                "data": {
                    "card": {"id": "C1", "shortLink": "abc123"},
                    "checklist": {"id": "S1", "name": "Shopping"},
                    "checkItem": {"id": "I1", "name": "Buy milk", "state": "incomplete"}
                }
            }
        }))
    }

    fn mirrored(short_link: &str, checklist_id: &str, item_id: &str, name: &str, checked: bool) -> CheckItem {
        let full = OriginTag::new(short_link, checklist_id, item_id).mirrored_name(name);
        CheckItem::new(format!("master_{item_id}"), full, checked)
    }

    #[tokio::test]
    async fn sub_create_mirrors_one_master_item() {
        let mock = Arc::new(MockTrackingClient::new());
        reconciler(mock.clone())
            .handle_change_event(&sub_create_event())
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(
            calls,
            vec![MockCall::Create {
                checklist_id: "M1".into(),
                name: "Buy milk https://trello.com/c/abc123 [src:abc123|S1|I1]".into(),
                checked: false,
                position: Position::Top,
            }]
        );

        // The tag on the created item decodes back to its origin.
        let created = &mock.items()[0];
        let tag = OriginTag::decode(&created.name).unwrap();
        assert!(tag.refers_to("S1", "I1"));
    }

    #[tokio::test]
    async fn untagged_master_create_is_foreign_and_untouched() {
        let mock = Arc::new(MockTrackingClient::new());
        let foreign = event(serde_json::json!({
            "action": {
                "type": "createCheckItem",
                "data": {
                    "card": {"id": "MC1", "shortLink": "mmm111"},
                    "checklist": {"id": "M1", "name": "Master"},
                    "checkItem": {"id": "X1", "name": "Handwritten", "state": "incomplete"}
                }
            }
        }));

        reconciler(mock.clone()).handle_change_event(&foreign).await.unwrap();
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn tagged_master_echo_is_suppressed() {
        let mock = Arc::new(MockTrackingClient::new());
        let echo = event(serde_json::json!({
            "action": {
                "type": "createCheckItem",
                "data": {
                    "card": {"id": "MC1", "shortLink": "mmm111"},
                    "checklist": {"id": "M1", "name": "Master"},
                    "checkItem": {
                        "id": "X1",
                        "name": "Buy milk https://trello.com/c/abc123 [src:abc123|S1|I1]",
                        "state": "incomplete"
                    }
                }
            }
        }));

        reconciler(mock.clone()).handle_change_event(&echo).await.unwrap();
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn toggle_updates_master_then_converges() {
        let mock = Arc::new(MockTrackingClient::with_items(vec![
            mirrored("abc123", "S1", "I1", "Buy milk", false),
        ]));
        let rec = reconciler(mock.clone());

        let toggle = event(serde_json::json!({
            "action": {
                "type": "updateCheckItemState",
                "data": {
                    "card": {"id": "C1", "shortLink": "abc123"},
                    "checklist": {"id": "S1", "name": "Shopping"},
                    "checkItem": {"id": "I1", "name": "Buy milk", "state": "complete"}
                }
            }
        }));

        rec.handle_change_event(&toggle).await.unwrap();
        assert_eq!(
            mock.calls(),
            vec![
                MockCall::List { checklist_id: "M1".into() },
                MockCall::UpdateState {
                    card_id: "MC1".into(),
                    item_id: "master_I1".into(),
                    checked: true,
                },
            ]
        );

        // Second delivery of the same event: state already matches, so
        // the lookup finds nothing to do.
        rec.handle_change_event(&toggle).await.unwrap();
        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[2], MockCall::List { .. }));
    }

    #[tokio::test]
    async fn toggle_without_mirror_is_a_noop() {
        let mock = Arc::new(MockTrackingClient::with_items(vec![
            CheckItem::new("F1", "Foreign entry", false),
        ]));
        let toggle = event(serde_json::json!({
            "action": {
                "type": "updateCheckItemState",
                "data": {
                    "card": {"id": "C1", "shortLink": "abc123"},
                    "checklist": {"id": "S1", "name": "Shopping"},
                    "checkItem": {"id": "I9", "name": "Ghost", "state": "complete"}
                }
            }
        }));

        reconciler(mock.clone()).handle_change_event(&toggle).await.unwrap();
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], MockCall::List { .. }));
    }

    #[tokio::test]
    async fn delete_removes_only_the_matching_mirror() {
        let mock = Arc::new(MockTrackingClient::with_items(vec![
            mirrored("abc123", "S1", "I1", "Buy milk", false),
            mirrored("abc123", "S1", "I2", "Buy bread", false),
        ]));
        let delete = event(serde_json::json!({
            "action": {
                "type": "deleteCheckItem",
                "data": {
                    "card": {"id": "C1", "shortLink": "abc123"},
                    "checklist": {"id": "S1", "name": "Shopping"},
                    "checkItem": {"id": "I1", "name": "Buy milk"}
                }
            }
        }));

        reconciler(mock.clone()).handle_change_event(&delete).await.unwrap();
        assert_eq!(
            mock.calls()[1],
            MockCall::Delete {
                checklist_id: "M1".into(),
                item_id: "master_I1".into(),
            }
        );
        assert_eq!(mock.items().len(), 1);
        assert_eq!(mock.items()[0].id, "master_I2");
    }

    #[tokio::test]
    async fn delete_without_mirror_issues_no_deletion() {
        let mock = Arc::new(MockTrackingClient::new());
        let delete = event(serde_json::json!({
            "action": {
                "type": "deleteCheckItem",
                "data": {
                    "card": {"id": "C1", "shortLink": "abc123"},
                    "checklist": {"id": "S1", "name": "Shopping"},
                    "checkItem": {"id": "I1", "name": "Buy milk"}
                }
            }
        }));

        reconciler(mock.clone()).handle_change_event(&delete).await.unwrap();
        let calls = mock.calls();
        assert_eq!(calls.len(), 1, "lookup only, no mutation: {calls:?}");
        assert!(matches!(calls[0], MockCall::List { .. }));
    }

    #[tokio::test]
    async fn removed_checklist_deletes_exactly_its_mirrors() {
        let mock = Arc::new(MockTrackingClient::with_items(vec![
            mirrored("abc123", "S1", "I1", "Buy milk", false),
            mirrored("abc123", "S1", "I2", "Buy bread", true),
            mirrored("zzz999", "S2", "I3", "Other list", false),
            CheckItem::new("F1", "Foreign entry", false),
        ]));
        let removal = event(serde_json::json!({
            "action": {
                "type": "removeChecklistFromCard",
                "data": {
                    "card": {"id": "C1"},
                    "checklist": {"id": "S1", "name": "Shopping"}
                }
            }
        }));

        reconciler(mock.clone()).handle_change_event(&removal).await.unwrap();

        let deletes: Vec<_> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Delete { item_id, .. } => Some(item_id),
                _ => None,
            })
            .collect();
        assert_eq!(deletes, vec!["master_I1".to_string(), "master_I2".to_string()]);

        let remaining: Vec<_> = mock.items().into_iter().map(|i| i.id).collect();
        assert_eq!(remaining, vec!["master_I3".to_string(), "F1".to_string()]);
    }

    #[tokio::test]
    async fn checklist_removal_on_master_card_is_suppressed() {
        let mock = Arc::new(MockTrackingClient::with_items(vec![
            mirrored("abc123", "S1", "I1", "Buy milk", false),
        ]));
        let removal = event(serde_json::json!({
            "action": {
                "type": "removeChecklistFromCard",
                "data": {
                    "card": {"id": "MC1"},
                    "checklist": {"id": "S1", "name": "Shopping"}
                }
            }
        }));

        reconciler(mock.clone()).handle_change_event(&removal).await.unwrap();
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn unrelated_and_unknown_events_issue_no_calls() {
        let mock = Arc::new(MockTrackingClient::new());
        let rec = reconciler(mock.clone());

        let unrelated = event(serde_json::json!({
            "action": {
                "type": "createCheckItem",
                "data": {
                    "card": {"id": "C1", "shortLink": "abc123"},
                    "checklist": {"id": "S9", "name": "Chores"},
                    "checkItem": {"id": "I1", "name": "Mop floor"}
                }
            }
        }));
        rec.handle_change_event(&unrelated).await.unwrap();

        let unknown = event(serde_json::json!({
            "action": {"type": "addMemberToBoard", "data": {}}
        }));
        rec.handle_change_event(&unknown).await.unwrap();

        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn sub_rename_is_not_mirrored() {
        let mock = Arc::new(MockTrackingClient::new());
        let rename = event(serde_json::json!({
            "action": {
                "type": "updateCheckItem",
                "data": {
                    "card": {"id": "C1", "shortLink": "abc123"},
                    "checklist": {"id": "S1", "name": "Shopping"},
                    "checkItem": {"id": "I1", "name": "Buy oat milk"}
                }
            }
        }));

        reconciler(mock.clone()).handle_change_event(&rename).await.unwrap();
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn remote_failure_aborts_only_this_event() {
        let mock = Arc::new(MockTrackingClient::new());
        mock.fail_with(RemoteError::from_status(500, "boom".into()));
        let rec = reconciler(mock.clone());

        let err = rec.handle_change_event(&sub_create_event()).await.unwrap_err();
        assert_eq!(err.error_kind(), "server_error");
        assert_eq!(mock.call_count(), 1);

        // Engine is still usable for the next event; nothing was poisoned.
        let err = rec.handle_change_event(&sub_create_event()).await.unwrap_err();
        assert_eq!(err.error_kind(), "server_error");
        assert_eq!(mock.call_count(), 2);
    }
}
