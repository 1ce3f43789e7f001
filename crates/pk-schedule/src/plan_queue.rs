//! `PlanQueue` — the time-ordered queue of pending plans.
//!
//! # Ordering
//!
//! Plans are stored in a `BTreeMap` keyed by `(time, sequence)`, where
//! `sequence` is a global submission counter.  Popping the first entry
//! therefore yields the earliest plan, and among plans due at the same time
//! the one submitted first.  For a fixed sequence of `push` calls the
//! dispatch order is fully reproducible.
//!
//! # Keys
//!
//! A plan may carry a [`Key`] scoped to its owning component.  At most one
//! pending plan holds a given (component, key) pair; the pair is released
//! when the plan is popped or cancelled and may then be reused.
//!
//! # Time
//!
//! The queue owns the current-time cursor.  `pop_next` advances it to the
//! popped plan's time and `push` refuses times before it, so the cursor never
//! decreases.

use std::collections::{BTreeMap, HashMap};

use pk_core::{ComponentId, Key, Time};

use crate::{PlanError, PlanResult};

/// Position of a plan in the queue, returned by [`PlanQueue::push`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanHandle {
    pub time:     Time,
    pub sequence: u64,
}

struct QueuedPlan<P> {
    component: ComponentId,
    key:       Option<Key>,
    payload:   P,
}

/// A plan removed from the queue for dispatch.
#[derive(Debug)]
pub struct DuePlan<P> {
    pub component: ComponentId,
    pub time:      Time,
    pub key:       Option<Key>,
    pub payload:   P,
}

/// Priority queue of pending plans, ordered by time then submission order.
pub struct PlanQueue<P> {
    queue:         BTreeMap<PlanHandle, QueuedPlan<P>>,
    keyed:         HashMap<ComponentId, HashMap<Key, PlanHandle>>,
    now:           Time,
    next_sequence: u64,
    dispatched:    u64,
}

impl<P> PlanQueue<P> {
    /// An empty queue whose time cursor starts at `start`.
    pub fn new(start: Time) -> Self {
        Self {
            queue:         BTreeMap::new(),
            keyed:         HashMap::new(),
            now:           start,
            next_sequence: 0,
            dispatched:    0,
        }
    }

    /// The current simulation time: the time of the last popped plan, or the
    /// start time before the first pop.
    #[inline]
    pub fn now(&self) -> Time {
        self.now
    }

    /// Schedule `payload` for `component` at `time`.
    ///
    /// # Errors
    ///
    /// - [`PlanError::InvalidPlanTime`] if `time` is NaN or infinite.
    /// - [`PlanError::PastPlanningTime`] if `time < now()`.
    /// - [`PlanError::NullPlanKey`] if `key` is the empty tuple.
    /// - [`PlanError::DuplicatePlanKey`] if `component` already holds a
    ///   pending plan with `key`.
    ///
    /// The queue is unchanged when an error is returned.
    pub fn push(
        &mut self,
        component: ComponentId,
        payload:   P,
        time:      Time,
        key:       Option<Key>,
    ) -> PlanResult<PlanHandle> {
        if !time.is_finite() {
            return Err(PlanError::InvalidPlanTime(time));
        }
        if time < self.now {
            return Err(PlanError::PastPlanningTime { time, now: self.now });
        }

        let handle = PlanHandle { time, sequence: self.next_sequence };

        if let Some(key) = &key {
            if key.is_null() {
                return Err(PlanError::NullPlanKey);
            }
            let owned = self.keyed.entry(component).or_default();
            if owned.contains_key(key) {
                return Err(PlanError::DuplicatePlanKey { component, key: key.clone() });
            }
            owned.insert(key.clone(), handle);
        }

        self.next_sequence += 1;
        self.queue.insert(handle, QueuedPlan { component, key, payload });
        Ok(handle)
    }

    /// The pending payload `component` holds under `key`, if any.
    pub fn get(&self, component: ComponentId, key: &Key) -> PlanResult<Option<&P>> {
        let Some(handle) = self.handle_of(component, key)? else {
            return Ok(None);
        };
        Ok(self.queue.get(&handle).map(|plan| &plan.payload))
    }

    /// The scheduled time of the plan `component` holds under `key`, if any.
    pub fn time_of(&self, component: ComponentId, key: &Key) -> PlanResult<Option<Time>> {
        Ok(self.handle_of(component, key)?.map(|h| h.time))
    }

    /// Remove the pending plan `component` holds under `key`, returning its
    /// payload.  Unknown or already-dispatched keys are a no-op (`None`).
    pub fn cancel(&mut self, component: ComponentId, key: &Key) -> PlanResult<Option<P>> {
        if key.is_null() {
            return Err(PlanError::NullPlanKey);
        }
        let Some(handle) = self.release_key(component, key) else {
            return Ok(None);
        };
        Ok(self.queue.remove(&handle).map(|plan| plan.payload))
    }

    /// Keys of `component`'s pending plans, in submission order.
    pub fn keys(&self, component: ComponentId) -> Vec<Key> {
        let Some(owned) = self.keyed.get(&component) else {
            return Vec::new();
        };
        let mut entries: Vec<(&PlanHandle, &Key)> =
            owned.iter().map(|(key, handle)| (handle, key)).collect();
        entries.sort_by_key(|(handle, _)| handle.sequence);
        entries.into_iter().map(|(_, key)| key.clone()).collect()
    }

    /// Remove the earliest plan and advance the time cursor to its time.
    ///
    /// Returns `None` when the queue is empty; the cursor is left unchanged.
    pub fn pop_next(&mut self) -> Option<DuePlan<P>> {
        let (handle, plan) = self.queue.pop_first()?;
        debug_assert!(handle.time >= self.now, "plan queue time went backwards");
        self.now = handle.time;
        self.dispatched += 1;

        if let Some(key) = &plan.key {
            self.release_key(plan.component, key);
        }

        Some(DuePlan {
            component: plan.component,
            time:      handle.time,
            key:       plan.key,
            payload:   plan.payload,
        })
    }

    /// Time of the earliest pending plan, or `None` if the queue is empty.
    pub fn next_time(&self) -> Option<Time> {
        self.queue.keys().next().map(|h| h.time)
    }

    /// Number of pending plans.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of plans popped so far.
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched
    }

    /// Number of components holding at least one keyed plan.
    pub fn keyed_component_count(&self) -> usize {
        self.keyed.len()
    }

    /// Drop `component`'s claim on `key`; a component left with no keys
    /// loses its entry.
    fn release_key(&mut self, component: ComponentId, key: &Key) -> Option<PlanHandle> {
        let owned = self.keyed.get_mut(&component)?;
        let handle = owned.remove(key);
        if owned.is_empty() {
            self.keyed.remove(&component);
        }
        handle
    }

    fn handle_of(&self, component: ComponentId, key: &Key) -> PlanResult<Option<PlanHandle>> {
        if key.is_null() {
            return Err(PlanError::NullPlanKey);
        }
        Ok(self
            .keyed
            .get(&component)
            .and_then(|owned| owned.get(key))
            .copied())
    }
}
