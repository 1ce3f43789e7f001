//! Attribute dimensions a partition can be sensitive to.

use std::fmt;

use pk_core::{PersonPropertyId, ResourceId};
use pk_store::Change;

/// One independently changing attribute of a person.
///
/// The registry keeps, per dimension, the partitions whose filter or labels
/// read it; a change touching a dimension re-evaluates only those.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dimension {
    Compartment,
    Region,
    PersonProperty(PersonPropertyId),
    PersonResource(ResourceId),
    /// Any group membership of the person.
    GroupMembership,
}

impl Dimension {
    /// The person-attribute dimension `change` touches.
    ///
    /// `None` for person lifecycle changes (which touch every partition) and
    /// for changes that no person-level filter or labeler can observe.
    pub fn of(change: &Change) -> Option<Dimension> {
        match change {
            Change::Compartment { .. } => Some(Dimension::Compartment),
            Change::Region { .. } => Some(Dimension::Region),
            Change::PersonProperty { property, .. } => Some(Dimension::PersonProperty(*property)),
            Change::PersonResource { resource, .. } => Some(Dimension::PersonResource(*resource)),
            Change::GroupMembership { .. } => Some(Dimension::GroupMembership),
            Change::PersonAdded(_)
            | Change::PersonRemoved(_)
            | Change::RegionResource { .. }
            | Change::GroupAdded { .. }
            | Change::GroupRemoved { .. }
            | Change::GroupProperty { .. } => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Compartment => f.write_str("compartment"),
            Dimension::Region => f.write_str("region"),
            Dimension::PersonProperty(id) => write!(f, "{id}"),
            Dimension::PersonResource(id) => write!(f, "{id}"),
            Dimension::GroupMembership => f.write_str("group membership"),
        }
    }
}
