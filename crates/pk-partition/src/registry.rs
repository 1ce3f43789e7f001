//! `PartitionRegistry` — every attached partition plus the relevance index
//! that routes changes to them.
//!
//! # Maintenance
//!
//! ```text
//! apply(change):
//!     keys = match change {
//!         PersonAdded / PersonRemoved -> every partition
//!         touches dimension d        -> relevance[d]
//!         otherwise                  -> none
//!     }
//!     for key in keys (attach order):
//!         refresh(key, person)  ->  Entered / Left deltas
//! ```
//!
//! Partitions are visited in attach order, so the deltas reported for one
//! change are deterministic.

use pk_core::{Key, PersonId, RngStreams};
use pk_store::{AttributeStore, Change};
use rustc_hash::FxHashMap;
use tracing::{info, trace};

use crate::index::{Placement, PopulationIndex};
use crate::{Dimension, LabelSet, Partition, PartitionError, PartitionResult, Sampler};

/// A person entering or leaving a partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipDelta {
    pub key:    Key,
    pub person: PersonId,
    pub joined: bool,
}

#[derive(Default)]
pub struct PartitionRegistry {
    /// Attach order.
    keys:      Vec<Key>,
    indexes:   FxHashMap<Key, PopulationIndex>,
    relevance: FxHashMap<Dimension, Vec<Key>>,
}

impl PartitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Validate `partition` and index the current population under `key`.
    pub fn add_partition(
        &mut self,
        key:       Key,
        partition: Partition,
        store:     &AttributeStore,
    ) -> PartitionResult<()> {
        if key.is_null() {
            return Err(PartitionError::NullPartitionKey);
        }
        if self.indexes.contains_key(&key) {
            return Err(PartitionError::DuplicateIndexedPopulation(key));
        }
        partition.validate(store.universe())?;

        let dimensions = partition.dimensions();
        let index = PopulationIndex::build(partition, store)?;
        info!(partition = %key, members = index.len(), "partition added");

        for d in dimensions {
            self.relevance.entry(d).or_default().push(key.clone());
        }
        self.keys.push(key.clone());
        self.indexes.insert(key, index);
        Ok(())
    }

    /// Discard a partition and all its index state.
    pub fn remove_partition(&mut self, key: &Key) -> PartitionResult<()> {
        if self.indexes.remove(key).is_none() {
            return Err(PartitionError::UnknownPopulationPartitionKey(key.clone()));
        }
        self.keys.retain(|k| k != key);
        for keys in self.relevance.values_mut() {
            keys.retain(|k| k != key);
        }
        self.relevance.retain(|_, keys| !keys.is_empty());
        info!(partition = %key, "partition removed");
        Ok(())
    }

    pub fn contains_partition(&self, key: &Key) -> bool {
        self.indexes.contains_key(key)
    }

    /// Attached keys in attach order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Members matching `query` (everyone when `None`), ascending.
    pub fn partition_people(
        &self,
        key:   &Key,
        query: Option<&LabelSet>,
    ) -> PartitionResult<Vec<PersonId>> {
        let index = self.checked(key, query)?;
        Ok(index.people(query))
    }

    pub fn partition_size(&self, key: &Key, query: Option<&LabelSet>) -> PartitionResult<usize> {
        let index = self.checked(key, query)?;
        Ok(index.size(query))
    }

    pub fn person_in_partition(
        &self,
        person: PersonId,
        key:    &Key,
        query:  Option<&LabelSet>,
    ) -> PartitionResult<bool> {
        let index = self.checked(key, query)?;
        Ok(index.contains(person, query))
    }

    /// Labels of the bucket holding `person`, `None` if it is not a member.
    pub fn person_labels(&self, person: PersonId, key: &Key) -> PartitionResult<Option<&LabelSet>> {
        let index = self.checked(key, None)?;
        Ok(index.labels_of(person))
    }

    /// Draw one member according to `sampler`.  `Ok(None)` when nothing is
    /// eligible.
    pub fn sample_partition(
        &self,
        key:     &Key,
        sampler: &Sampler,
        rngs:    &mut RngStreams,
    ) -> PartitionResult<Option<PersonId>> {
        let index = self.checked(key, sampler.query())?;
        let rng = rngs.get_mut(sampler.rng)?;
        Ok(index.sample(
            sampler.query(),
            sampler.weights.as_deref(),
            sampler.excluded,
            rng,
        ))
    }

    fn checked(&self, key: &Key, query: Option<&LabelSet>) -> PartitionResult<&PopulationIndex> {
        if key.is_null() {
            return Err(PartitionError::NullPartitionKey);
        }
        let index = self
            .indexes
            .get(key)
            .ok_or_else(|| PartitionError::UnknownPopulationPartitionKey(key.clone()))?;
        if let Some(query) = query {
            index.partition().check_query(key, query)?;
        }
        Ok(index)
    }

    // ── Maintenance ───────────────────────────────────────────────────────

    /// Bring every affected partition up to date with `change`, which the
    /// store has already applied.
    pub fn apply(
        &mut self,
        store:  &AttributeStore,
        change: &Change,
    ) -> PartitionResult<Vec<MembershipDelta>> {
        let Some(person) = change.person() else {
            return Ok(Vec::new());
        };
        let keys: &[Key] = match change {
            Change::PersonAdded(_) | Change::PersonRemoved(_) => &self.keys,
            _ => match Dimension::of(change).and_then(|d| self.relevance.get(&d)) {
                Some(keys) => keys,
                None => return Ok(Vec::new()),
            },
        };

        let mut deltas = Vec::new();
        for key in keys {
            let Some(index) = self.indexes.get_mut(key) else {
                continue;
            };
            match index.refresh(store, person)? {
                Some(Placement::Entered) => {
                    trace!(partition = %key, %person, "entered");
                    deltas.push(MembershipDelta { key: key.clone(), person, joined: true });
                }
                Some(Placement::Left) => {
                    trace!(partition = %key, %person, "left");
                    deltas.push(MembershipDelta { key: key.clone(), person, joined: false });
                }
                Some(Placement::Moved) => trace!(partition = %key, %person, "moved"),
                None => {}
            }
        }
        Ok(deltas)
    }
}
