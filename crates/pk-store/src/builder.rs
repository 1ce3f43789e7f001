//! Fluent builder for an `AttributeStore` with its initial population.
//!
//! # Usage
//!
//! ```rust
//! use pk_core::{CompartmentId, GroupTypeId, PersonId, RegionId, Time};
//! use pk_store::{PersonSeed, StoreBuilder, Universe};
//!
//! let universe = Universe::builder().compartments(2).regions(2).group_type(vec![]).build();
//!
//! let store = StoreBuilder::new(universe)
//!     .person(PersonSeed::new(CompartmentId(0), RegionId(0)))
//!     .person(PersonSeed::new(CompartmentId(1), RegionId(1)))
//!     .group(GroupTypeId(0), vec![PersonId(0), PersonId(1)])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(store.population_count(), 2);
//! assert_eq!(store.group_count(), 1);
//! ```

use pk_core::{GroupTypeId, PersonId, Time};

use crate::{AttributeStore, PersonSeed, StoreResult, Universe};

/// Fluent builder for [`AttributeStore`].
///
/// People receive ids in the order they are added, starting at
/// `PersonId(0)`, so group member lists can refer to them before `build`.
pub struct StoreBuilder {
    universe: Universe,
    start:    Time,
    people:   Vec<PersonSeed>,
    groups:   Vec<(GroupTypeId, Vec<PersonId>)>,
}

impl StoreBuilder {
    pub fn new(universe: Universe) -> Self {
        Self {
            universe,
            start:  Time::ZERO,
            people: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Time stamped on initial values of tracked attributes.  Default 0.
    pub fn start_time(mut self, start: Time) -> Self {
        self.start = start;
        self
    }

    pub fn person(mut self, seed: PersonSeed) -> Self {
        self.people.push(seed);
        self
    }

    pub fn people(mut self, seeds: impl IntoIterator<Item = PersonSeed>) -> Self {
        self.people.extend(seeds);
        self
    }

    /// Create a group of `group_type` whose members join in list order.
    pub fn group(mut self, group_type: GroupTypeId, members: Vec<PersonId>) -> Self {
        self.groups.push((group_type, members));
        self
    }

    /// Construct the store, validating every seed and membership.
    pub fn build(self) -> StoreResult<AttributeStore> {
        let mut store = AttributeStore::new(self.universe, self.start);
        for seed in &self.people {
            store.add_person(seed, self.start)?;
        }
        for (group_type, members) in self.groups {
            let (group, _) = store.add_group(group_type)?;
            for person in members {
                store.add_person_to_group(person, group)?;
            }
        }
        Ok(store)
    }
}
