//! Core attribute storage: people, their compartments, regions, properties and
//! resources, plus region resource levels.
//!
//! # Layout
//!
//! Person state is kept Structure-of-Arrays: every per-person `Vec` is indexed
//! by `PersonId` and has one slot per id ever allocated.  Removed people keep
//! their slot (ids are never reused) with `alive[id] == false`; every checked
//! accessor refuses them with `UnknownPersonId`.
//!
//! ```ignore
//! let region = store.person_region(person)?;   // O(1), one Vec index
//! ```
//!
//! Mutators validate everything before writing anything, so a failed call
//! leaves the store untouched.  Each successful mutator returns the
//! [`Change`] it applied.

use pk_core::{
    CompartmentId, GroupId, PersonId, PersonPropertyId, PropertyValue, RegionId, ResourceId, Time,
};

use crate::group::GroupRecord;
use crate::{Change, StoreError, StoreResult, Universe};

// ── PersonSeed ────────────────────────────────────────────────────────────────

/// Initial attributes of a person being added.
///
/// Properties not listed take their declared default; resources not listed
/// start at zero.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PersonSeed {
    pub compartment: CompartmentId,
    pub region:      RegionId,
    pub properties:  Vec<(PersonPropertyId, PropertyValue)>,
    pub resources:   Vec<(ResourceId, u64)>,
}

impl PersonSeed {
    pub fn new(compartment: CompartmentId, region: RegionId) -> Self {
        Self {
            compartment,
            region,
            properties: Vec::new(),
            resources:  Vec::new(),
        }
    }

    pub fn with_property(mut self, id: PersonPropertyId, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((id, value.into()));
        self
    }

    pub fn with_resource(mut self, id: ResourceId, amount: u64) -> Self {
        self.resources.push((id, amount));
        self
    }
}

// ── Columns ───────────────────────────────────────────────────────────────────

/// One person property across all people.  `times` exists only for
/// time-tracked properties.
struct PropertyColumn {
    values: Vec<PropertyValue>,
    times:  Option<Vec<Time>>,
}

/// One resource across all holders (people or regions).
struct ResourceColumn {
    levels: Vec<u64>,
    times:  Option<Vec<Time>>,
}

impl ResourceColumn {
    fn new(tracked: bool, len: usize, now: Time) -> Self {
        Self {
            levels: vec![0; len],
            times:  tracked.then(|| vec![now; len]),
        }
    }

    #[inline]
    fn set(&mut self, index: usize, level: u64, now: Time) {
        self.levels[index] = level;
        if let Some(times) = &mut self.times {
            times[index] = now;
        }
    }
}

fn add_checked(resource: ResourceId, balance: u64, amount: u64) -> StoreResult<u64> {
    balance
        .checked_add(amount)
        .ok_or(StoreError::ResourceArithmetic { resource, balance, amount })
}

fn sub_checked(resource: ResourceId, balance: u64, amount: u64) -> StoreResult<u64> {
    balance.checked_sub(amount).ok_or(StoreError::InsufficientResourcesAvailable {
        resource,
        available: balance,
        requested: amount,
    })
}

// ── AttributeStore ────────────────────────────────────────────────────────────

/// Authoritative per-person, per-region and per-group simulation state.
pub struct AttributeStore {
    universe: Universe,

    // ── Person state (SoA, indexed by PersonId) ───────────────────────────
    alive:               Vec<bool>,
    compartment:         Vec<CompartmentId>,
    region:              Vec<RegionId>,
    compartment_arrival: Option<Vec<Time>>,
    region_arrival:      Option<Vec<Time>>,
    properties:          Vec<PropertyColumn>,
    person_resources:    Vec<ResourceColumn>,
    /// Sorted ascending by `GroupId`.
    pub(crate) memberships: Vec<Vec<GroupId>>,

    // ── Population counts ─────────────────────────────────────────────────
    population:             usize,
    region_population:      Vec<usize>,
    compartment_population: Vec<usize>,

    // ── Region state (indexed by RegionId) ────────────────────────────────
    region_resources: Vec<ResourceColumn>,

    // ── Groups (indexed by GroupId; `None` once removed) ──────────────────
    pub(crate) groups:      Vec<Option<GroupRecord>>,
    pub(crate) group_count: usize,
}

impl AttributeStore {
    /// An empty population over `universe`, with region balances stamped at
    /// `start`.
    pub fn new(universe: Universe, start: Time) -> Self {
        let regions = universe.region_count();
        let properties = (0..universe.person_property_count())
            .map(|i| {
                let tracked = universe
                    .person_property(PersonPropertyId(i as u16))
                    .map(|def| def.is_time_tracked())
                    .unwrap_or(false);
                PropertyColumn {
                    values: Vec::new(),
                    times:  tracked.then(Vec::new),
                }
            })
            .collect();
        let resource_tracking: Vec<bool> = (0..universe.resource_count())
            .map(|i| {
                universe
                    .resource(ResourceId(i as u16))
                    .map(|def| def.time_tracked)
                    .unwrap_or(false)
            })
            .collect();

        Self {
            alive:               Vec::new(),
            compartment:         Vec::new(),
            region:              Vec::new(),
            compartment_arrival: universe.tracks_compartment_arrival().then(Vec::new),
            region_arrival:      universe.tracks_region_arrival().then(Vec::new),
            properties,
            person_resources:    resource_tracking
                .iter()
                .map(|&tracked| ResourceColumn::new(tracked, 0, start))
                .collect(),
            memberships:         Vec::new(),

            population:             0,
            region_population:      vec![0; regions],
            compartment_population: vec![0; universe.compartment_count()],

            region_resources: resource_tracking
                .iter()
                .map(|&tracked| ResourceColumn::new(tracked, regions, start))
                .collect(),

            groups:      Vec::new(),
            group_count: 0,

            universe,
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    // ── People: lifecycle ─────────────────────────────────────────────────

    /// Add a person with the attributes in `seed`.
    ///
    /// Seed properties may set immutable properties; later writes may not.
    pub fn add_person(&mut self, seed: &PersonSeed, now: Time) -> StoreResult<(PersonId, Change)> {
        self.universe.check_compartment(seed.compartment)?;
        self.universe.check_region(seed.region)?;
        for (id, value) in &seed.properties {
            self.universe.person_property(*id)?.check(value)?;
        }
        for (id, _) in &seed.resources {
            self.universe.resource(*id)?;
        }

        let person = PersonId(self.alive.len() as u32);

        self.alive.push(true);
        self.compartment.push(seed.compartment);
        self.region.push(seed.region);
        if let Some(times) = &mut self.compartment_arrival {
            times.push(now);
        }
        if let Some(times) = &mut self.region_arrival {
            times.push(now);
        }
        for (i, column) in self.properties.iter_mut().enumerate() {
            let id = PersonPropertyId(i as u16);
            let value = seed
                .properties
                .iter()
                .rev()
                .find(|(pid, _)| *pid == id)
                .map(|(_, v)| v.clone());
            let value = match value {
                Some(v) => v,
                None => self.universe.person_property(id)?.default_value().clone(),
            };
            column.values.push(value);
            if let Some(times) = &mut column.times {
                times.push(now);
            }
        }
        for column in &mut self.person_resources {
            column.levels.push(0);
            if let Some(times) = &mut column.times {
                times.push(now);
            }
        }
        for &(id, amount) in &seed.resources {
            self.person_resources[id.index()].set(person.index(), amount, now);
        }
        self.memberships.push(Vec::new());

        self.population += 1;
        self.region_population[seed.region.index()] += 1;
        self.compartment_population[seed.compartment.index()] += 1;

        Ok((person, Change::PersonAdded(person)))
    }

    /// Remove a person, first removing it from every group it belongs to.
    ///
    /// Returns the membership removals (in ascending group order) followed by
    /// [`Change::PersonRemoved`].  The person's resources are discarded.
    pub fn remove_person(&mut self, person: PersonId) -> StoreResult<Vec<Change>> {
        self.check_person(person)?;
        let idx = person.index();

        let groups = std::mem::take(&mut self.memberships[idx]);
        let mut changes = Vec::with_capacity(groups.len() + 1);
        for group in groups {
            if let Some(Some(record)) = self.groups.get_mut(group.index()) {
                record.members.retain(|&m| m != person);
            }
            changes.push(Change::GroupMembership { group, person, joined: false });
        }

        self.alive[idx] = false;
        self.population -= 1;
        self.region_population[self.region[idx].index()] -= 1;
        self.compartment_population[self.compartment[idx].index()] -= 1;
        for column in &mut self.person_resources {
            column.levels[idx] = 0;
        }

        changes.push(Change::PersonRemoved(person));
        Ok(changes)
    }

    // ── People: queries ───────────────────────────────────────────────────

    #[inline]
    pub fn person_exists(&self, person: PersonId) -> bool {
        self.alive.get(person.index()).copied().unwrap_or(false)
    }

    pub fn check_person(&self, person: PersonId) -> StoreResult<()> {
        if self.person_exists(person) {
            Ok(())
        } else {
            Err(StoreError::UnknownPersonId(person))
        }
    }

    /// Number of living people.
    #[inline]
    pub fn population_count(&self) -> usize {
        self.population
    }

    /// Number of person ids ever allocated (living or removed).
    #[inline]
    pub fn person_capacity(&self) -> usize {
        self.alive.len()
    }

    /// Iterator over living people in ascending id order.
    pub fn person_ids(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(i, _)| PersonId(i as u32))
    }

    pub fn person_compartment(&self, person: PersonId) -> StoreResult<CompartmentId> {
        self.check_person(person)?;
        Ok(self.compartment[person.index()])
    }

    pub fn person_region(&self, person: PersonId) -> StoreResult<RegionId> {
        self.check_person(person)?;
        Ok(self.region[person.index()])
    }

    pub fn person_compartment_arrival_time(&self, person: PersonId) -> StoreResult<Time> {
        self.check_person(person)?;
        self.compartment_arrival
            .as_ref()
            .map(|times| times[person.index()])
            .ok_or(StoreError::CompartmentArrivalNotTracked)
    }

    pub fn person_region_arrival_time(&self, person: PersonId) -> StoreResult<Time> {
        self.check_person(person)?;
        self.region_arrival
            .as_ref()
            .map(|times| times[person.index()])
            .ok_or(StoreError::RegionArrivalNotTracked)
    }

    pub fn person_property(
        &self,
        person:   PersonId,
        property: PersonPropertyId,
    ) -> StoreResult<&PropertyValue> {
        self.check_person(person)?;
        let column = self
            .properties
            .get(property.index())
            .ok_or(StoreError::UnknownPersonPropertyId(property))?;
        Ok(&column.values[person.index()])
    }

    pub fn person_property_time(
        &self,
        person:   PersonId,
        property: PersonPropertyId,
    ) -> StoreResult<Time> {
        self.check_person(person)?;
        let column = self
            .properties
            .get(property.index())
            .ok_or(StoreError::UnknownPersonPropertyId(property))?;
        column
            .times
            .as_ref()
            .map(|times| times[person.index()])
            .ok_or(StoreError::PropertyTimeNotTracked(property))
    }

    pub fn person_resource(&self, person: PersonId, resource: ResourceId) -> StoreResult<u64> {
        self.check_person(person)?;
        Ok(self.person_resource_column(resource)?.levels[person.index()])
    }

    pub fn person_resource_time(&self, person: PersonId, resource: ResourceId) -> StoreResult<Time> {
        self.check_person(person)?;
        self.person_resource_column(resource)?
            .times
            .as_ref()
            .map(|times| times[person.index()])
            .ok_or(StoreError::ResourceTimeNotTracked(resource))
    }

    pub fn region_resource(&self, region: RegionId, resource: ResourceId) -> StoreResult<u64> {
        self.universe.check_region(region)?;
        Ok(self.region_resource_column(resource)?.levels[region.index()])
    }

    pub fn region_resource_time(&self, region: RegionId, resource: ResourceId) -> StoreResult<Time> {
        self.universe.check_region(region)?;
        self.region_resource_column(resource)?
            .times
            .as_ref()
            .map(|times| times[region.index()])
            .ok_or(StoreError::ResourceTimeNotTracked(resource))
    }

    pub fn region_population_count(&self, region: RegionId) -> StoreResult<usize> {
        self.universe.check_region(region)?;
        Ok(self.region_population[region.index()])
    }

    pub fn compartment_population_count(&self, compartment: CompartmentId) -> StoreResult<usize> {
        self.universe.check_compartment(compartment)?;
        Ok(self.compartment_population[compartment.index()])
    }

    /// Living people in `region`, ascending.  O(capacity).
    pub fn people_in_region(&self, region: RegionId) -> StoreResult<Vec<PersonId>> {
        self.universe.check_region(region)?;
        Ok(self
            .person_ids()
            .filter(|p| self.region[p.index()] == region)
            .collect())
    }

    /// Living people in `compartment`, ascending.  O(capacity).
    pub fn people_in_compartment(&self, compartment: CompartmentId) -> StoreResult<Vec<PersonId>> {
        self.universe.check_compartment(compartment)?;
        Ok(self
            .person_ids()
            .filter(|p| self.compartment[p.index()] == compartment)
            .collect())
    }

    /// Living people whose `property` equals `value`, ascending.  O(capacity).
    pub fn people_with_property_value(
        &self,
        property: PersonPropertyId,
        value:    &PropertyValue,
    ) -> StoreResult<Vec<PersonId>> {
        self.universe.person_property(property)?.check(value)?;
        let column = &self.properties[property.index()];
        Ok(self
            .person_ids()
            .filter(|p| column.values[p.index()] == *value)
            .collect())
    }

    // ── People: mutators ──────────────────────────────────────────────────

    pub fn set_person_compartment(
        &mut self,
        person:      PersonId,
        compartment: CompartmentId,
        now:         Time,
    ) -> StoreResult<Change> {
        self.check_person(person)?;
        self.universe.check_compartment(compartment)?;
        let idx = person.index();

        let from = self.compartment[idx];
        self.compartment[idx] = compartment;
        self.compartment_population[from.index()] -= 1;
        self.compartment_population[compartment.index()] += 1;
        if let Some(times) = &mut self.compartment_arrival {
            times[idx] = now;
        }
        Ok(Change::Compartment { person, from, to: compartment })
    }

    pub fn set_person_region(
        &mut self,
        person: PersonId,
        region: RegionId,
        now:    Time,
    ) -> StoreResult<Change> {
        self.check_person(person)?;
        self.universe.check_region(region)?;
        let idx = person.index();

        let from = self.region[idx];
        self.region[idx] = region;
        self.region_population[from.index()] -= 1;
        self.region_population[region.index()] += 1;
        if let Some(times) = &mut self.region_arrival {
            times[idx] = now;
        }
        Ok(Change::Region { person, from, to: region })
    }

    pub fn set_person_property(
        &mut self,
        person:   PersonId,
        property: PersonPropertyId,
        value:    PropertyValue,
        now:      Time,
    ) -> StoreResult<Change> {
        self.check_person(person)?;
        let definition = self.universe.person_property(property)?;
        if !definition.is_mutable() {
            return Err(StoreError::ImmutablePersonProperty(property));
        }
        definition.check(&value)?;

        let column = &mut self.properties[property.index()];
        let previous = std::mem::replace(&mut column.values[person.index()], value.clone());
        if let Some(times) = &mut column.times {
            times[person.index()] = now;
        }
        Ok(Change::PersonProperty { person, property, previous, current: value })
    }

    // ── Resources ─────────────────────────────────────────────────────────

    pub fn add_resource_to_region(
        &mut self,
        region:   RegionId,
        resource: ResourceId,
        amount:   u64,
        now:      Time,
    ) -> StoreResult<Change> {
        self.universe.check_region(region)?;
        let column = self.region_resource_column_mut(resource)?;
        let previous = column.levels[region.index()];
        let current = add_checked(resource, previous, amount)?;
        column.set(region.index(), current, now);
        Ok(Change::RegionResource { region, resource, previous, current })
    }

    pub fn remove_resource_from_region(
        &mut self,
        region:   RegionId,
        resource: ResourceId,
        amount:   u64,
        now:      Time,
    ) -> StoreResult<Change> {
        self.universe.check_region(region)?;
        let column = self.region_resource_column_mut(resource)?;
        let previous = column.levels[region.index()];
        let current = sub_checked(resource, previous, amount)?;
        column.set(region.index(), current, now);
        Ok(Change::RegionResource { region, resource, previous, current })
    }

    /// Move `amount` from the person's current region to the person.
    ///
    /// Returns the region change followed by the person change.
    pub fn transfer_resource_to_person(
        &mut self,
        person:   PersonId,
        resource: ResourceId,
        amount:   u64,
        now:      Time,
    ) -> StoreResult<[Change; 2]> {
        self.check_person(person)?;
        let region = self.region[person.index()];
        let region_before = self.region_resource_column(resource)?.levels[region.index()];
        let person_before = self.person_resource_column(resource)?.levels[person.index()];

        let region_after = sub_checked(resource, region_before, amount)?;
        let person_after = add_checked(resource, person_before, amount)?;

        self.region_resources[resource.index()].set(region.index(), region_after, now);
        self.person_resources[resource.index()].set(person.index(), person_after, now);
        Ok([
            Change::RegionResource {
                region,
                resource,
                previous: region_before,
                current:  region_after,
            },
            Change::PersonResource {
                person,
                resource,
                previous: person_before,
                current:  person_after,
            },
        ])
    }

    /// Move `amount` from the person back to the person's current region.
    ///
    /// Returns the person change followed by the region change.
    pub fn transfer_resource_from_person(
        &mut self,
        person:   PersonId,
        resource: ResourceId,
        amount:   u64,
        now:      Time,
    ) -> StoreResult<[Change; 2]> {
        self.check_person(person)?;
        let region = self.region[person.index()];
        let region_before = self.region_resource_column(resource)?.levels[region.index()];
        let person_before = self.person_resource_column(resource)?.levels[person.index()];

        let person_after = sub_checked(resource, person_before, amount)?;
        let region_after = add_checked(resource, region_before, amount)?;

        self.person_resources[resource.index()].set(person.index(), person_after, now);
        self.region_resources[resource.index()].set(region.index(), region_after, now);
        Ok([
            Change::PersonResource {
                person,
                resource,
                previous: person_before,
                current:  person_after,
            },
            Change::RegionResource {
                region,
                resource,
                previous: region_before,
                current:  region_after,
            },
        ])
    }

    /// Consume `amount` of a person's resource (it leaves the simulation).
    pub fn remove_resource_from_person(
        &mut self,
        person:   PersonId,
        resource: ResourceId,
        amount:   u64,
        now:      Time,
    ) -> StoreResult<Change> {
        self.check_person(person)?;
        let column = self.person_resource_column_mut(resource)?;
        let previous = column.levels[person.index()];
        let current = sub_checked(resource, previous, amount)?;
        column.set(person.index(), current, now);
        Ok(Change::PersonResource { person, resource, previous, current })
    }

    /// Move `amount` between two distinct regions.
    pub fn transfer_resource_between_regions(
        &mut self,
        from:     RegionId,
        to:       RegionId,
        resource: ResourceId,
        amount:   u64,
        now:      Time,
    ) -> StoreResult<[Change; 2]> {
        self.universe.check_region(from)?;
        self.universe.check_region(to)?;
        if from == to {
            return Err(StoreError::ReflexiveResourceTransfer(from));
        }
        let column = self.region_resource_column_mut(resource)?;
        let from_before = column.levels[from.index()];
        let to_before = column.levels[to.index()];
        let from_after = sub_checked(resource, from_before, amount)?;
        let to_after = add_checked(resource, to_before, amount)?;

        column.set(from.index(), from_after, now);
        column.set(to.index(), to_after, now);
        Ok([
            Change::RegionResource {
                region:   from,
                resource,
                previous: from_before,
                current:  from_after,
            },
            Change::RegionResource {
                region:   to,
                resource,
                previous: to_before,
                current:  to_after,
            },
        ])
    }

    // ── Internal helpers ──────────────────────────────────────────────────

    fn person_resource_column(&self, resource: ResourceId) -> StoreResult<&ResourceColumn> {
        self.person_resources
            .get(resource.index())
            .ok_or(StoreError::UnknownResourceId(resource))
    }

    fn person_resource_column_mut(&mut self, resource: ResourceId) -> StoreResult<&mut ResourceColumn> {
        self.person_resources
            .get_mut(resource.index())
            .ok_or(StoreError::UnknownResourceId(resource))
    }

    fn region_resource_column(&self, resource: ResourceId) -> StoreResult<&ResourceColumn> {
        self.region_resources
            .get(resource.index())
            .ok_or(StoreError::UnknownResourceId(resource))
    }

    fn region_resource_column_mut(&mut self, resource: ResourceId) -> StoreResult<&mut ResourceColumn> {
        self.region_resources
            .get_mut(resource.index())
            .ok_or(StoreError::UnknownResourceId(resource))
    }
}
