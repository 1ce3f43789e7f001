//! The scenario universe: every id a simulation may refer to, with the
//! property definitions and time-tracking policies attached to them.
//!
//! The universe is an input to the kernel.  Loading and validating scenario
//! files is the application's job; this module only records what the store
//! must check on every mutation.

use pk_core::{
    CompartmentId, GroupPropertyId, GroupTypeId, PersonPropertyId, PropertyDefinition, RegionId,
    ResourceId,
};

use crate::{StoreError, StoreResult};

/// Declaration of a resource type.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceDefinition {
    /// Record the time of every change to a person's or region's balance.
    pub time_tracked: bool,
}

/// Declaration of a group type and the properties its groups carry.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupTypeDefinition {
    pub properties: Vec<PropertyDefinition>,
}

/// Immutable description of the identifier space of one scenario.
///
/// All ids are dense from zero in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Universe {
    compartment_count:         u16,
    region_count:              u16,
    resources:                 Vec<ResourceDefinition>,
    person_properties:         Vec<PropertyDefinition>,
    group_types:               Vec<GroupTypeDefinition>,
    track_region_arrival:      bool,
    track_compartment_arrival: bool,
}

impl Universe {
    pub fn builder() -> UniverseBuilder {
        UniverseBuilder::default()
    }

    #[inline]
    pub fn compartment_count(&self) -> usize {
        self.compartment_count as usize
    }

    #[inline]
    pub fn region_count(&self) -> usize {
        self.region_count as usize
    }

    #[inline]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    #[inline]
    pub fn person_property_count(&self) -> usize {
        self.person_properties.len()
    }

    #[inline]
    pub fn group_type_count(&self) -> usize {
        self.group_types.len()
    }

    #[inline]
    pub fn tracks_region_arrival(&self) -> bool {
        self.track_region_arrival
    }

    #[inline]
    pub fn tracks_compartment_arrival(&self) -> bool {
        self.track_compartment_arrival
    }

    pub fn compartment_ids(&self) -> impl Iterator<Item = CompartmentId> {
        (0..self.compartment_count).map(CompartmentId)
    }

    pub fn region_ids(&self) -> impl Iterator<Item = RegionId> {
        (0..self.region_count).map(RegionId)
    }

    pub fn check_compartment(&self, id: CompartmentId) -> StoreResult<()> {
        if id.0 < self.compartment_count {
            Ok(())
        } else {
            Err(StoreError::UnknownCompartmentId(id))
        }
    }

    pub fn check_region(&self, id: RegionId) -> StoreResult<()> {
        if id.0 < self.region_count {
            Ok(())
        } else {
            Err(StoreError::UnknownRegionId(id))
        }
    }

    pub fn resource(&self, id: ResourceId) -> StoreResult<&ResourceDefinition> {
        self.resources.get(id.index()).ok_or(StoreError::UnknownResourceId(id))
    }

    pub fn person_property(&self, id: PersonPropertyId) -> StoreResult<&PropertyDefinition> {
        self.person_properties
            .get(id.index())
            .ok_or(StoreError::UnknownPersonPropertyId(id))
    }

    pub fn group_type(&self, id: GroupTypeId) -> StoreResult<&GroupTypeDefinition> {
        self.group_types.get(id.index()).ok_or(StoreError::UnknownGroupTypeId(id))
    }

    pub fn group_property(
        &self,
        group_type: GroupTypeId,
        property:   GroupPropertyId,
    ) -> StoreResult<&PropertyDefinition> {
        self.group_type(group_type)?
            .properties
            .get(property.index())
            .ok_or(StoreError::UnknownGroupPropertyId { group_type, property })
    }
}

// ── UniverseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Universe`].
///
/// ```rust
/// use pk_core::{PersonPropertyId, PropertyDefinition};
/// use pk_store::Universe;
///
/// let universe = Universe::builder()
///     .compartments(3)
///     .regions(2)
///     .resources(1)
///     .person_property(PropertyDefinition::new(false).time_tracked())
///     .build();
///
/// assert_eq!(universe.region_count(), 2);
/// assert!(universe.person_property(PersonPropertyId(0)).unwrap().is_time_tracked());
/// ```
#[derive(Default)]
pub struct UniverseBuilder {
    universe: Universe,
}

impl UniverseBuilder {
    /// Declare `n` compartments, `CompartmentId(0)..CompartmentId(n)`.
    pub fn compartments(mut self, n: u16) -> Self {
        self.universe.compartment_count = n;
        self
    }

    /// Declare `n` regions, `RegionId(0)..RegionId(n)`.
    pub fn regions(mut self, n: u16) -> Self {
        self.universe.region_count = n;
        self
    }

    /// Append `n` untracked resources.
    pub fn resources(mut self, n: u16) -> Self {
        for _ in 0..n {
            self.universe.resources.push(ResourceDefinition::default());
        }
        self
    }

    /// Append one resource whose balance changes are time-stamped.
    pub fn tracked_resource(mut self) -> Self {
        self.universe.resources.push(ResourceDefinition { time_tracked: true });
        self
    }

    /// Append a person property; its id is the number declared before it.
    pub fn person_property(mut self, definition: PropertyDefinition) -> Self {
        self.universe.person_properties.push(definition);
        self
    }

    /// Append a group type carrying `properties`.
    pub fn group_type(mut self, properties: Vec<PropertyDefinition>) -> Self {
        self.universe.group_types.push(GroupTypeDefinition { properties });
        self
    }

    pub fn track_region_arrival(mut self) -> Self {
        self.universe.track_region_arrival = true;
        self
    }

    pub fn track_compartment_arrival(mut self) -> Self {
        self.universe.track_compartment_arrival = true;
        self
    }

    pub fn build(self) -> Universe {
        self.universe
    }
}
