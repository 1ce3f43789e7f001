use pk_core::{
    CompartmentId, CoreError, GroupId, GroupPropertyId, GroupTypeId, PersonId, PersonPropertyId,
    RegionId, ResourceId,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("person {0} does not exist")]
    UnknownPersonId(PersonId),

    #[error("group {0} does not exist")]
    UnknownGroupId(GroupId),

    #[error("unknown compartment {0}")]
    UnknownCompartmentId(CompartmentId),

    #[error("unknown region {0}")]
    UnknownRegionId(RegionId),

    #[error("unknown resource {0}")]
    UnknownResourceId(ResourceId),

    #[error("unknown person property {0}")]
    UnknownPersonPropertyId(PersonPropertyId),

    #[error("unknown group type {0}")]
    UnknownGroupTypeId(GroupTypeId),

    #[error("group type {group_type} has no property {property}")]
    UnknownGroupPropertyId {
        group_type: GroupTypeId,
        property:   GroupPropertyId,
    },

    #[error("person property {0} is immutable")]
    ImmutablePersonProperty(PersonPropertyId),

    #[error("group property {0} is immutable")]
    ImmutableGroupProperty(GroupPropertyId),

    #[error(transparent)]
    Value(#[from] CoreError),

    #[error("insufficient {resource}: {available} available, {requested} requested")]
    InsufficientResourcesAvailable {
        resource:  ResourceId,
        available: u64,
        requested: u64,
    },

    #[error("adding {amount} to a {resource} balance of {balance} overflows")]
    ResourceArithmetic {
        resource: ResourceId,
        balance:  u64,
        amount:   u64,
    },

    #[error("cannot transfer resources from {0} to itself")]
    ReflexiveResourceTransfer(RegionId),

    #[error("{person} is already a member of {group}")]
    DuplicateGroupMembership { person: PersonId, group: GroupId },

    #[error("{person} is not a member of {group}")]
    NonGroupMember { person: PersonId, group: GroupId },

    #[error("region arrival times are not tracked")]
    RegionArrivalNotTracked,

    #[error("compartment arrival times are not tracked")]
    CompartmentArrivalNotTracked,

    #[error("assignment times of person property {0} are not tracked")]
    PropertyTimeNotTracked(PersonPropertyId),

    #[error("assignment times of resource {0} are not tracked")]
    ResourceTimeNotTracked(ResourceId),
}

pub type StoreResult<T> = Result<T, StoreError>;
