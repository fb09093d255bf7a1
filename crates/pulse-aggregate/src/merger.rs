//! The session merger — the pure heart of aggregation.
//!
//! [`merge_events`] folds one batch of events into user actions, given the
//! still-open actions persisted by earlier runs. It performs no I/O, so the
//! merge semantics (grouping, gap handling, chunk-timing accumulation, the
//! sub-second read discard) are testable without a database.

use std::collections::{BTreeMap, HashMap};

use pulse_core::{
    ActionData, AggregatorKind, AggregatorMode, ChunkTiming, Event, EventData, ReadActionPayload,
    UserAction,
};

/// Read sessions shorter than this are noise (an open/close flicker) and
/// are not recorded.
pub const MIN_READ_SESSION_MS: i64 = 1_000;

/// The result of merging one batch.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Actions to upsert, in first-touch event order.
    pub actions: Vec<UserAction>,
    /// How many of `actions` are new this batch.
    pub to_add_count: u64,
    /// How many of `actions` extend or close a previously persisted action.
    pub to_complete_count: u64,
}

struct Working {
    action: UserAction,
    existed: bool,
}

/// Fold a batch of events into user actions.
///
/// `open` holds persisted actions still eligible for extension, keyed by
/// merge key. An event extends an open action when its `occurred_at` is
/// within `gap_ms` of the action's `end`; otherwise it starts a new action.
/// Events whose kind does not belong to `aggregator` are ignored.
#[must_use]
pub fn merge_events(
    aggregator: AggregatorKind,
    open: &HashMap<String, UserAction>,
    events: &[Event],
    gap_ms: i64,
) -> MergeOutcome {
    match aggregator.mode() {
        AggregatorMode::Instant => merge_instant(aggregator, events),
        AggregatorMode::Session => merge_sessions(aggregator, open, events, gap_ms),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Instant mode
// ─────────────────────────────────────────────────────────────────────────────

fn merge_instant(aggregator: AggregatorKind, events: &[Event]) -> MergeOutcome {
    let mut actions = Vec::new();
    for event in events {
        if !aggregator.source_kinds().contains(&event.kind()) {
            continue;
        }
        let (EventData::ItemCreated(payload)
        | EventData::ItemDeleted(payload)
        | EventData::ItemHardDeleted(payload)) = &event.data
        else {
            continue;
        };
        actions.push(UserAction {
            account_id: event.account_id.clone(),
            kind: aggregator.action_kind(),
            user_id: event.user_id.clone(),
            start: event.occurred_at,
            end: event.occurred_at,
            data: ActionData::ItemChurn(payload.clone()),
        });
    }
    MergeOutcome {
        to_add_count: actions.len() as u64,
        to_complete_count: 0,
        actions,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session mode
// ─────────────────────────────────────────────────────────────────────────────

fn merge_sessions(
    aggregator: AggregatorKind,
    open: &HashMap<String, UserAction>,
    events: &[Event],
    gap_ms: i64,
) -> MergeOutcome {
    let mut order: Vec<String> = Vec::new();
    let mut working: HashMap<String, Working> = HashMap::new();

    for event in events {
        if !aggregator.source_kinds().contains(&event.kind()) {
            continue;
        }
        let key = event.data.merge_key().to_string();

        if let Some(w) = working.get_mut(&key) {
            apply(w, event);
            continue;
        }

        if let Some(existing) = open.get(&key) {
            if event.occurred_at.saturating_sub(existing.end) <= gap_ms {
                let mut w = Working {
                    action: existing.clone(),
                    existed: true,
                };
                apply(&mut w, event);
                order.push(key.clone());
                let _ = working.insert(key, w);
                continue;
            }
        }

        if let Some(action) = start_action(aggregator, event) {
            let mut w = Working {
                action,
                existed: false,
            };
            apply(&mut w, event);
            order.push(key.clone());
            let _ = working.insert(key, w);
        }
    }

    let mut outcome = MergeOutcome::default();
    for key in order {
        let Some(w) = working.remove(&key) else {
            continue;
        };
        if discard(&w) {
            continue;
        }
        if w.existed {
            outcome.to_complete_count += 1;
        } else {
            outcome.to_add_count += 1;
        }
        outcome.actions.push(w.action);
    }
    outcome
}

/// A brand-new read session that opened and closed within the minimum
/// duration never amounted to reading; drop it. Incomplete sessions are
/// kept — a later batch may still grow them past the threshold.
fn discard(w: &Working) -> bool {
    if w.existed {
        return false;
    }
    match &w.action.data {
        ActionData::Read(read) => !read.incomplete && w.action.duration_ms() < MIN_READ_SESSION_MS,
        ActionData::ItemChurn(_) | ActionData::Edit(_) => false,
    }
}

/// Build the skeletal action for a session's first observed event. Payload
/// state from the event itself is folded in by `apply` afterwards.
fn start_action(aggregator: AggregatorKind, event: &Event) -> Option<UserAction> {
    let data = match &event.data {
        EventData::BinderEdited(p) => ActionData::Edit(p.clone()),
        EventData::DocumentOpened(p) | EventData::DocumentClosed(p) => {
            ActionData::Read(ReadActionPayload {
                session_id: p.session_id.clone(),
                binder_id: p.binder_id.clone(),
                publication_id: p.publication_id.clone(),
                item_title: p.item_title.clone(),
                incomplete: true,
                chunk_timings: BTreeMap::new(),
            })
        }
        EventData::ChunkBrowsed(p) => ActionData::Read(ReadActionPayload {
            session_id: p.session_id.clone(),
            binder_id: p.binder_id.clone(),
            publication_id: p.publication_id.clone(),
            // Title only travels on open/close events; backfilled if one
            // arrives later in the session.
            item_title: String::new(),
            incomplete: true,
            chunk_timings: BTreeMap::new(),
        }),
        EventData::ReadSessionFocus(p) | EventData::ReadSessionBlur(p) => {
            ActionData::Read(ReadActionPayload {
                session_id: p.session_id.clone(),
                binder_id: String::new(),
                publication_id: p.publication_id.clone(),
                item_title: String::new(),
                incomplete: true,
                chunk_timings: BTreeMap::new(),
            })
        }
        EventData::ItemCreated(_) | EventData::ItemDeleted(_) | EventData::ItemHardDeleted(_) => {
            return None;
        }
    };
    Some(UserAction {
        account_id: event.account_id.clone(),
        kind: aggregator.action_kind(),
        user_id: event.user_id.clone(),
        start: event.occurred_at,
        end: event.occurred_at,
        data,
    })
}

/// Fold one event into a working action: extend the interval and merge
/// payload state.
fn apply(w: &mut Working, event: &Event) {
    let action = &mut w.action;
    if action.user_id.is_none() {
        action.user_id.clone_from(&event.user_id);
    }
    if event.occurred_at > action.end {
        action.end = event.occurred_at;
    }

    match (&mut action.data, &event.data) {
        (ActionData::Read(read), EventData::ChunkBrowsed(p)) => {
            let entry = read
                .chunk_timings
                .entry(p.chunk_index)
                .or_insert(ChunkTiming {
                    word_count: p.word_count,
                    time_spent_ms: 0,
                });
            entry.word_count = p.word_count;
            entry.time_spent_ms += p.time_spent_ms;
        }
        (ActionData::Read(read), EventData::DocumentClosed(_)) => {
            read.incomplete = false;
        }
        (ActionData::Read(read), EventData::DocumentOpened(p)) => {
            if read.item_title.is_empty() {
                read.item_title.clone_from(&p.item_title);
            }
            if read.binder_id.is_empty() {
                read.binder_id.clone_from(&p.binder_id);
            }
        }
        _ => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
