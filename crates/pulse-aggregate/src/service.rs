//! The [`TrackingService`] facade — the public surface of the engine.
//!
//! Bundles the aggregation engine, the store's read-back queries, and the
//! hierarchy lookup behind three operations: aggregate, find actions, and
//! last-aggregation-time.

use std::sync::Arc;

use tracing::instrument;

use pulse_core::{UserAction, UserActionKind};
use pulse_events::{ActionFilter, HierarchyLookup, TrackingStore};

use crate::coordinator::{AggregateOptions, AggregationConfig, AggregationEngine, EngineDeps};
use crate::errors::{AggregateError, Result};
use crate::report::AggregationReport;

/// Filter for [`TrackingService::find_user_actions`].
#[derive(Clone, Debug, Default)]
pub struct FindUserActionsFilter {
    /// Restrict to these kinds; empty means all kinds.
    pub kinds: Vec<UserActionKind>,
    /// Only actions whose interval ends at or after this time.
    pub from: Option<i64>,
    /// Only actions whose interval starts at or before this time.
    pub to: Option<i64>,
    /// Scope to this item's subtree (expanded via the hierarchy lookup).
    pub item_id: Option<String>,
}

/// Public facade over engine, store, and hierarchy.
pub struct TrackingService {
    engine: AggregationEngine,
    store: Arc<TrackingStore>,
    hierarchy: Arc<dyn HierarchyLookup>,
}

impl TrackingService {
    /// Assemble the service. The store doubles as the engine's event
    /// source.
    #[must_use]
    pub fn new(
        store: Arc<TrackingStore>,
        hierarchy: Arc<dyn HierarchyLookup>,
        config: AggregationConfig,
    ) -> Self {
        let engine = AggregationEngine::new(EngineDeps {
            source: store.clone(),
            store: store.clone(),
            config,
        });
        Self {
            engine,
            store,
            hierarchy,
        }
    }

    /// Assemble the service with an explicit dependency bundle (tests
    /// inject fault-injecting sources here).
    #[must_use]
    pub fn with_deps(deps: EngineDeps, hierarchy: Arc<dyn HierarchyLookup>) -> Self {
        let store = deps.store.clone();
        Self {
            engine: AggregationEngine::new(deps),
            store,
            hierarchy,
        }
    }

    /// Aggregate pending events for the given accounts. See
    /// [`AggregationEngine::aggregate_user_events`].
    pub fn aggregate_user_events(
        &self,
        account_ids: &[String],
        opts: &AggregateOptions,
    ) -> Result<AggregationReport> {
        self.engine.aggregate_user_events(account_ids, opts)
    }

    /// Find aggregated actions for an account. When `item_id` is set the
    /// filter covers the item's whole subtree.
    #[instrument(skip(self, filter))]
    pub fn find_user_actions(
        &self,
        account_id: &str,
        filter: &FindUserActionsFilter,
    ) -> Result<Vec<UserAction>> {
        if account_id.is_empty() {
            return Err(AggregateError::Usage("empty account id".into()));
        }
        let item_ids = filter
            .item_id
            .as_deref()
            .map(|item_id| self.hierarchy.descendants(item_id))
            .transpose()?;
        let actions = self.store.find_user_actions(
            account_id,
            &ActionFilter {
                kinds: filter.kinds.clone(),
                from: filter.from,
                to: filter.to,
                item_ids,
            },
        )?;
        Ok(actions)
    }

    /// When this account's actions were last brought up to date, if ever.
    pub fn last_user_actions_aggregation_time(&self, account_id: &str) -> Result<Option<i64>> {
        if account_id.is_empty() {
            return Err(AggregateError::Usage("empty account id".into()));
        }
        Ok(self.store.last_aggregation_time(account_id)?)
    }

    /// All account IDs present in the event log.
    pub fn known_account_ids(&self) -> Result<Vec<String>> {
        Ok(self.store.distinct_account_ids()?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_events::FlatHierarchy;

    fn service() -> TrackingService {
        let store = Arc::new(TrackingStore::open_in_memory().unwrap());
        TrackingService::new(store, Arc::new(FlatHierarchy), AggregationConfig::default())
    }

    #[test]
    fn empty_account_id_rejected() {
        let svc = service();
        assert!(matches!(
            svc.find_user_actions("", &FindUserActionsFilter::default()),
            Err(AggregateError::Usage(_))
        ));
        assert!(matches!(
            svc.last_user_actions_aggregation_time(""),
            Err(AggregateError::Usage(_))
        ));
    }

    #[test]
    fn unknown_account_has_no_aggregation_time() {
        let svc = service();
        assert!(svc
            .last_user_actions_aggregation_time("acct-1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn find_on_empty_store_is_empty() {
        let svc = service();
        let actions = svc
            .find_user_actions("acct-1", &FindUserActionsFilter::default())
            .unwrap();
        assert!(actions.is_empty());
    }
}
