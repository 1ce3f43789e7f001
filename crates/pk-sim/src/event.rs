//! Event categories components subscribe to, and the events delivered.

use pk_core::{CompartmentId, Key, PersonPropertyId, RegionId, ResourceId};
use pk_partition::MembershipDelta;
use pk_store::Change;

/// What a component can subscribe to.
///
/// Location and attribute categories are scoped to one id; group and
/// person-lifecycle categories are global.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventCategory {
    PersonCreation,
    PersonRemoval,
    CompartmentArrival(CompartmentId),
    CompartmentDeparture(CompartmentId),
    RegionArrival(RegionId),
    RegionDeparture(RegionId),
    PersonPropertyChange(PersonPropertyId),
    PersonResourceChange(ResourceId),
    RegionResourceChange(ResourceId),
    GroupConstruction,
    GroupDestruction,
    GroupMembershipChange,
    GroupPropertyChange,
    /// People entering or leaving the partition with this key.
    PartitionMembership(Key),
}

/// One notification, delivered to every component subscribed to any of its
/// categories.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Change(Change),
    Partition(MembershipDelta),
}

impl Event {
    /// The categories a subscriber may have used to ask for this event.
    ///
    /// A compartment move is both a departure and an arrival; a component
    /// subscribed to either still receives it once.
    pub fn categories(&self) -> Vec<EventCategory> {
        match self {
            Event::Change(change) => match change {
                Change::PersonAdded(_) => vec![EventCategory::PersonCreation],
                Change::PersonRemoved(_) => vec![EventCategory::PersonRemoval],
                Change::Compartment { from, to, .. } => vec![
                    EventCategory::CompartmentDeparture(*from),
                    EventCategory::CompartmentArrival(*to),
                ],
                Change::Region { from, to, .. } => vec![
                    EventCategory::RegionDeparture(*from),
                    EventCategory::RegionArrival(*to),
                ],
                Change::PersonProperty { property, .. } => {
                    vec![EventCategory::PersonPropertyChange(*property)]
                }
                Change::PersonResource { resource, .. } => {
                    vec![EventCategory::PersonResourceChange(*resource)]
                }
                Change::RegionResource { resource, .. } => {
                    vec![EventCategory::RegionResourceChange(*resource)]
                }
                Change::GroupAdded { .. } => vec![EventCategory::GroupConstruction],
                Change::GroupRemoved { .. } => vec![EventCategory::GroupDestruction],
                Change::GroupMembership { .. } => vec![EventCategory::GroupMembershipChange],
                Change::GroupProperty { .. } => vec![EventCategory::GroupPropertyChange],
            },
            Event::Partition(delta) => vec![EventCategory::PartitionMembership(delta.key.clone())],
        }
    }
}
