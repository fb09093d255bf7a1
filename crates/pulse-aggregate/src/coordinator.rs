//! The aggregation coordinator — drives the per-pair loop.
//!
//! Each (account, aggregator) pair is processed independently under its
//! lease: resolve the cursor, short-circuit when nothing new was logged,
//! fetch a bounded batch, merge, and commit actions plus cursor atomically.
//! A failing pair becomes an `exception` entry in the report; every other
//! pair still runs.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use pulse_core::{AggregatorKind, AggregatorMode, Event, UserAction, ALL_AGGREGATOR_KINDS};
use pulse_events::sqlite::row_types::EventRow;
use pulse_events::{ActionFilter, EventSource, TrackingStore};

use crate::errors::{AggregateError, Result};
use crate::lease::PairLease;
use crate::merger::merge_events;
use crate::report::{AggregationReport, AggregatorReportBody, RangeUsed};

/// Default session gap: a session-style event this long after an action's
/// end opens a new interval instead of extending.
pub const DEFAULT_SESSION_GAP_MS: i64 = 30 * 60 * 1000;

/// Default maximum events fetched per pair per run.
pub const DEFAULT_EVENT_LIMIT: u32 = 500;

/// Engine tuning knobs.
#[derive(Clone, Debug)]
pub struct AggregationConfig {
    /// Session merge gap in milliseconds (default: 30 minutes).
    pub session_gap_ms: i64,
    /// Events fetched per pair per run when the caller gives no limit.
    pub default_event_limit: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            session_gap_ms: DEFAULT_SESSION_GAP_MS,
            default_event_limit: DEFAULT_EVENT_LIMIT,
        }
    }
}

/// Explicit dependency bundle for [`AggregationEngine`].
#[derive(Clone)]
pub struct EngineDeps {
    /// Read seam over the event log.
    pub source: Arc<dyn EventSource>,
    /// Transactional store for actions and cursors.
    pub store: Arc<TrackingStore>,
    /// Tuning knobs.
    pub config: AggregationConfig,
}

/// Start the log scan at a fixed point instead of the stored cursor.
#[derive(Clone, Copy, Debug)]
pub struct RangeOverride {
    /// Exclusive `logged_at` lower bound; `0` replays the whole log.
    pub range_start: i64,
}

/// Per-call options for [`AggregationEngine::aggregate_user_events`].
#[derive(Clone, Debug, Default)]
pub struct AggregateOptions {
    /// Restrict to these aggregators; `None` runs all of them.
    pub aggregator_kinds: Option<Vec<AggregatorKind>>,
    /// Cap on events fetched per pair this run.
    pub limit_number_of_events: Option<u32>,
    /// Ignore stored cursors and scan from a fixed point (backfill).
    pub range_override: Option<RangeOverride>,
}

/// The aggregation engine.
pub struct AggregationEngine {
    deps: EngineDeps,
    lease: PairLease,
}

impl AggregationEngine {
    /// Create an engine from its dependency bundle.
    #[must_use]
    pub fn new(deps: EngineDeps) -> Self {
        Self {
            deps,
            lease: PairLease::new(),
        }
    }

    /// Aggregate pending events for the given accounts.
    ///
    /// Fails synchronously on caller mistakes (empty account list, empty
    /// aggregator list, zero limit) before any I/O. Once validation passes
    /// the call always returns a report: per-pair failures are captured as
    /// `exception` entries, never propagated.
    #[instrument(skip_all, fields(accounts = account_ids.len()))]
    pub fn aggregate_user_events(
        &self,
        account_ids: &[String],
        opts: &AggregateOptions,
    ) -> Result<AggregationReport> {
        if account_ids.is_empty() {
            return Err(AggregateError::Usage("no account ids given".into()));
        }
        if matches!(&opts.aggregator_kinds, Some(kinds) if kinds.is_empty()) {
            return Err(AggregateError::Usage("empty aggregator kind list".into()));
        }
        if opts.limit_number_of_events == Some(0) {
            return Err(AggregateError::Usage("event limit must be positive".into()));
        }

        let aggregators: Vec<AggregatorKind> = opts
            .aggregator_kinds
            .clone()
            .unwrap_or_else(|| ALL_AGGREGATOR_KINDS.to_vec());

        let mut report = AggregationReport::default();
        for account_id in account_ids {
            let account_report = report.account_mut(account_id);
            for aggregator in &aggregators {
                let body = match self.aggregate_pair(account_id, *aggregator, opts) {
                    Ok(body) => body,
                    Err(err) => {
                        warn!(account_id, aggregator = %aggregator, error = %err, "pair failed");
                        AggregatorReportBody {
                            exception: Some(err.to_string()),
                            ..Default::default()
                        }
                    }
                };
                let entry = account_report
                    .aggregator_reports
                    .entry(*aggregator)
                    .or_default();
                entry.merge(&body);
            }
        }
        info!(
            accounts = account_ids.len(),
            has_exceptions = report.has_exceptions(),
            "aggregation run complete"
        );
        Ok(report)
    }

    /// Run one (account, aggregator) pair under its lease.
    #[instrument(skip(self, opts), fields(aggregator = %aggregator))]
    fn aggregate_pair(
        &self,
        account_id: &str,
        aggregator: AggregatorKind,
        opts: &AggregateOptions,
    ) -> Result<AggregatorReportBody> {
        let pair_mutex = self.lease.acquire(account_id, aggregator);
        let _guard = pair_mutex.lock();

        let kinds = aggregator.source_kinds();
        let cursor = self.deps.store.cursor(account_id, aggregator)?;

        // 1. Resolve where this run starts on the log axis.
        let range_start = match (&opts.range_override, &cursor) {
            (Some(over), _) => over.range_start,
            (None, Some(cursor)) => cursor.last_event_ts,
            (None, None) => 0,
        };

        // 2. Short-circuit when the log holds nothing past the cursor.
        if opts.range_override.is_none() && cursor.is_some() {
            if !self
                .deps
                .source
                .has_events_after(account_id, kinds, range_start)?
            {
                debug!(range_start, "no new events since last aggregation");
                return Ok(AggregatorReportBody {
                    last_event_timestamp: cursor.map(|c| c.last_event_ts),
                    info: Some("no new events since last aggregation".into()),
                    ..Default::default()
                });
            }
        }

        // 3. Fetch a bounded batch and decode it. A malformed payload
        //    truncates the batch: everything before it is processed, the
        //    cursor stops at the last good event, and the decode failure
        //    becomes this pair's exception.
        let limit = opts
            .limit_number_of_events
            .unwrap_or(self.deps.config.default_event_limit);
        let rows = self
            .deps
            .source
            .fetch_events(account_id, kinds, range_start, i64::from(limit))?;
        let (events, decode_exception) = decode_rows(rows);

        if events.is_empty() {
            return Ok(AggregatorReportBody {
                last_event_timestamp: cursor.map(|c| c.last_event_ts),
                info: decode_exception
                    .is_none()
                    .then(|| "no events to aggregate".to_string()),
                exception: decode_exception,
                ..Default::default()
            });
        }

        // 4. Load still-open persisted actions for session merging.
        let open = match aggregator.mode() {
            AggregatorMode::Instant => HashMap::new(),
            AggregatorMode::Session => self.load_open_actions(account_id, aggregator, &events)?,
        };

        // 5. Merge and commit: actions plus the advanced cursor in one
        //    transaction, so a crash never leaves the cursor ahead of its
        //    actions. The cursor lands exactly on the last consumed event,
        //    which is what lets successive limited runs chain ranges.
        let outcome = merge_events(aggregator, &open, &events, self.deps.config.session_gap_ms);
        let last_event_ts = events.last().map_or(range_start, |e| e.logged_at);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let _ = self.deps.store.commit_outcome(
            account_id,
            aggregator,
            &outcome.actions,
            last_event_ts,
            now_ms,
        )?;

        Ok(AggregatorReportBody {
            to_add_count: outcome.to_add_count,
            to_complete_count: outcome.to_complete_count,
            oldest: outcome.actions.iter().map(|a| a.start).min(),
            newest: outcome.actions.iter().map(|a| a.start).max(),
            last_event_timestamp: Some(last_event_ts),
            range_used: Some(RangeUsed {
                range_start,
                range_end: last_event_ts,
            }),
            info: None,
            exception: decode_exception,
        })
    }

    /// Persisted actions whose session could still absorb events from this
    /// batch, keyed by merge key (latest interval per key wins).
    fn load_open_actions(
        &self,
        account_id: &str,
        aggregator: AggregatorKind,
        events: &[Event],
    ) -> Result<HashMap<String, UserAction>> {
        let earliest = events.iter().map(|e| e.occurred_at).min().unwrap_or(0);
        let filter = ActionFilter {
            kinds: vec![aggregator.action_kind()],
            from: Some(earliest.saturating_sub(self.deps.config.session_gap_ms)),
            to: None,
            item_ids: None,
        };
        let mut open: HashMap<String, UserAction> = HashMap::new();
        for action in self.deps.store.find_user_actions(account_id, &filter)? {
            let key = action.merge_key().to_string();
            match open.get(&key) {
                Some(existing) if existing.start >= action.start => {}
                _ => {
                    let _ = open.insert(key, action);
                }
            }
        }
        Ok(open)
    }
}

/// Decode fetched rows up to the first malformed payload.
fn decode_rows(rows: Vec<EventRow>) -> (Vec<Event>, Option<String>) {
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_event() {
            Ok(event) => events.push(event),
            Err(err) => return (events, Some(err.to_string())),
        }
    }
    (events, None)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
