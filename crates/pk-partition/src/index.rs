//! `PopulationIndex` — the bucketed membership of one partition.
//!
//! # Layout
//!
//! ```text
//! buckets:    Vec<Bucket { labels, members: Vec<PersonId> }>
//! bucket_ids: LabelSet -> bucket index
//! placement:  PersonId -> (bucket index, position in members)
//! ```
//!
//! Moving a person out of a bucket is a swap-remove, so every move is O(1)
//! plus the cost of evaluating the filter and labelers.  Buckets are never
//! dropped once created; an empty bucket is skipped by queries.

use pk_core::{PersonId, StreamRng};
use pk_store::{AttributeStore, StoreResult};
use rustc_hash::FxHashMap;

use crate::{LabelSet, Partition};

struct Bucket {
    labels:  LabelSet,
    members: Vec<PersonId>,
}

/// How one refresh changed a person's membership.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    Entered,
    Left,
    /// Still a member, under different labels.
    Moved,
}

pub(crate) struct PopulationIndex {
    partition:  Partition,
    buckets:    Vec<Bucket>,
    bucket_ids: FxHashMap<LabelSet, usize>,
    placement:  Vec<Option<(u32, u32)>>,
    size:       usize,
}

impl PopulationIndex {
    /// Index every living person in `store`.
    pub(crate) fn build(partition: Partition, store: &AttributeStore) -> StoreResult<Self> {
        let mut index = Self {
            partition,
            buckets: Vec::new(),
            bucket_ids: FxHashMap::default(),
            placement: vec![None; store.person_capacity()],
            size: 0,
        };
        for person in store.person_ids() {
            index.refresh(store, person)?;
        }
        Ok(index)
    }

    pub(crate) fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Re-evaluate `person` and move it to the bucket it now belongs in.
    pub(crate) fn refresh(
        &mut self,
        store:  &AttributeStore,
        person: PersonId,
    ) -> StoreResult<Option<Placement>> {
        let target = if store.person_exists(person) {
            self.partition.place(store, person)?
        } else {
            None
        };
        let current = self.placement.get(person.index()).copied().flatten();

        Ok(match (current, target) {
            (None, None) => None,
            (None, Some(labels)) => {
                self.insert(person, labels);
                Some(Placement::Entered)
            }
            (Some((bucket, pos)), None) => {
                self.detach(bucket as usize, pos as usize);
                Some(Placement::Left)
            }
            (Some((bucket, pos)), Some(labels)) => {
                if self.buckets[bucket as usize].labels == labels {
                    None
                } else {
                    self.detach(bucket as usize, pos as usize);
                    self.insert(person, labels);
                    Some(Placement::Moved)
                }
            }
        })
    }

    fn insert(&mut self, person: PersonId, labels: LabelSet) {
        let bucket = match self.bucket_ids.get(&labels) {
            Some(&b) => b,
            None => {
                let b = self.buckets.len();
                self.bucket_ids.insert(labels.clone(), b);
                self.buckets.push(Bucket { labels, members: Vec::new() });
                b
            }
        };
        let members = &mut self.buckets[bucket].members;
        let pos = members.len();
        members.push(person);

        if self.placement.len() <= person.index() {
            self.placement.resize(person.index() + 1, None);
        }
        if self.placement[person.index()].is_none() {
            self.size += 1;
        }
        self.placement[person.index()] = Some((bucket as u32, pos as u32));
    }

    /// Swap-remove the member at `pos`, clearing its placement.
    fn detach(&mut self, bucket: usize, pos: usize) {
        let members = &mut self.buckets[bucket].members;
        let removed = members.swap_remove(pos);
        if let Some(&moved) = members.get(pos) {
            self.placement[moved.index()] = Some((bucket as u32, pos as u32));
        }
        self.placement[removed.index()] = None;
        self.size -= 1;
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Number of people in the partition.
    pub(crate) fn len(&self) -> usize {
        self.size
    }

    /// Non-empty buckets whose labels satisfy `query`, in creation order.
    fn matching<'a>(&'a self, query: Option<&'a LabelSet>) -> impl Iterator<Item = &'a Bucket> {
        self.buckets
            .iter()
            .filter(move |b| !b.members.is_empty() && query.is_none_or(|q| b.labels.matches(q)))
    }

    pub(crate) fn people(&self, query: Option<&LabelSet>) -> Vec<PersonId> {
        let mut people: Vec<PersonId> = self
            .matching(query)
            .flat_map(|b| b.members.iter().copied())
            .collect();
        people.sort_unstable();
        people
    }

    pub(crate) fn size(&self, query: Option<&LabelSet>) -> usize {
        match query {
            None => self.size,
            Some(_) => self.matching(query).map(|b| b.members.len()).sum(),
        }
    }

    pub(crate) fn contains(&self, person: PersonId, query: Option<&LabelSet>) -> bool {
        match self.placement.get(person.index()).copied().flatten() {
            None => false,
            Some((bucket, _)) => {
                query.is_none_or(|q| self.buckets[bucket as usize].labels.matches(q))
            }
        }
    }

    /// Labels of the bucket holding `person`, if it is a member.
    pub(crate) fn labels_of(&self, person: PersonId) -> Option<&LabelSet> {
        self.placement
            .get(person.index())
            .copied()
            .flatten()
            .map(|(bucket, _)| &self.buckets[bucket as usize].labels)
    }

    // ── Sampling ──────────────────────────────────────────────────────────

    /// Draw one member.
    ///
    /// With `weights`, a bucket is drawn proportional to its weight (weights
    /// that are not finite and positive drop the bucket), then a member
    /// uniformly.  Without, a member is drawn uniformly over every candidate.
    /// `excluded` is never returned.
    pub(crate) fn sample(
        &self,
        query:    Option<&LabelSet>,
        weights:  Option<&dyn Fn(&LabelSet) -> f64>,
        excluded: Option<PersonId>,
        rng:      &mut StreamRng,
    ) -> Option<PersonId> {
        let excluded_slot = excluded.and_then(|p| self.placement.get(p.index()).copied().flatten());

        // (bucket, eligible member count, weight)
        let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
        for (b, bucket) in self.buckets.iter().enumerate() {
            if bucket.members.is_empty() || query.is_some_and(|q| !bucket.labels.matches(q)) {
                continue;
            }
            let eligible = match excluded_slot {
                Some((eb, _)) if eb as usize == b => bucket.members.len() - 1,
                _ => bucket.members.len(),
            };
            if eligible == 0 {
                continue;
            }
            let weight = match weights {
                Some(f) => f(&bucket.labels),
                None => eligible as f64,
            };
            if weight.is_finite() && weight > 0.0 {
                candidates.push((b, eligible, weight));
            }
        }

        let (bucket, eligible) = match weights {
            Some(_) => {
                let total: f64 = candidates.iter().map(|c| c.2).sum();
                if candidates.is_empty() || !total.is_finite() {
                    return None;
                }
                let mut target = rng.uniform() * total;
                let mut chosen = candidates[candidates.len() - 1];
                for c in &candidates {
                    if target < c.2 {
                        chosen = *c;
                        break;
                    }
                    target -= c.2;
                }
                (chosen.0, chosen.1)
            }
            None => {
                let total: usize = candidates.iter().map(|c| c.1).sum();
                if total == 0 {
                    return None;
                }
                let mut target = rng.below(total);
                let mut chosen = None;
                for c in &candidates {
                    if target < c.1 {
                        chosen = Some((c.0, c.1));
                        break;
                    }
                    target -= c.1;
                }
                chosen?
            }
        };

        let members = &self.buckets[bucket].members;
        let mut pos = rng.below(eligible);
        if let Some((eb, ep)) = excluded_slot {
            if eb as usize == bucket && pos >= ep as usize {
                pos += 1;
            }
        }
        members.get(pos).copied()
    }
}
