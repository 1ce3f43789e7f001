//! `Change` — the record of one applied mutation.
//!
//! Every successful store mutator returns the change(s) it applied.  The
//! store itself knows nothing about partitions or observers; the simulation
//! layer feeds each change to the partition engine and then to subscribed
//! components.

use pk_core::{
    CompartmentId, GroupId, GroupPropertyId, GroupTypeId, PersonId, PersonPropertyId,
    PropertyValue, RegionId, ResourceId,
};

/// One applied attribute mutation, carrying the previous and current values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Change {
    PersonAdded(PersonId),

    /// The person's attributes are no longer readable when this is observed.
    PersonRemoved(PersonId),

    Compartment {
        person: PersonId,
        from:   CompartmentId,
        to:     CompartmentId,
    },

    Region {
        person: PersonId,
        from:   RegionId,
        to:     RegionId,
    },

    PersonProperty {
        person:   PersonId,
        property: PersonPropertyId,
        previous: PropertyValue,
        current:  PropertyValue,
    },

    PersonResource {
        person:   PersonId,
        resource: ResourceId,
        previous: u64,
        current:  u64,
    },

    RegionResource {
        region:   RegionId,
        resource: ResourceId,
        previous: u64,
        current:  u64,
    },

    GroupAdded {
        group:      GroupId,
        group_type: GroupTypeId,
    },

    GroupRemoved {
        group:      GroupId,
        group_type: GroupTypeId,
    },

    GroupMembership {
        group:  GroupId,
        person: PersonId,
        joined: bool,
    },

    GroupProperty {
        group:    GroupId,
        property: GroupPropertyId,
        previous: PropertyValue,
        current:  PropertyValue,
    },
}

impl Change {
    /// The person whose attributes this change touches, if any.
    pub fn person(&self) -> Option<PersonId> {
        match self {
            Change::PersonAdded(p) | Change::PersonRemoved(p) => Some(*p),
            Change::Compartment { person, .. }
            | Change::Region { person, .. }
            | Change::PersonProperty { person, .. }
            | Change::PersonResource { person, .. }
            | Change::GroupMembership { person, .. } => Some(*person),
            Change::RegionResource { .. }
            | Change::GroupAdded { .. }
            | Change::GroupRemoved { .. }
            | Change::GroupProperty { .. } => None,
        }
    }
}
