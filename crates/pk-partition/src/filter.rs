//! Boolean person predicates.
//!
//! A [`Filter`] is a pure expression tree over a person's attributes.  It is
//! built freely and checked against the universe only when a partition is
//! attached ([`Filter::validate`]), so an order comparison against a NaN
//! value is reported at that point and not at construction.
//!
//! ```rust
//! use pk_core::{CompartmentId, PersonPropertyId, RegionId};
//! use pk_partition::{Equality, Filter};
//!
//! let adults_in_north = Filter::property(PersonPropertyId(0), Equality::GreaterThanEqual, 18i32)
//!     .and(Filter::region(RegionId(0)))
//!     .and(Filter::compartment(CompartmentId(1)).negate());
//! # let _ = adults_in_north;
//! ```

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use pk_core::{
    CompartmentId, GroupId, GroupTypeId, PersonId, PersonPropertyId, PropertyValue, RegionId,
    ResourceId,
};
use pk_store::{AttributeStore, Universe};

use crate::{Dimension, PartitionError, PartitionResult};

// ── Equality ──────────────────────────────────────────────────────────────────

/// Comparison operator used by filter primitives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Equality {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl Equality {
    /// `true` for the four order comparisons.
    pub fn is_order(self) -> bool {
        !matches!(self, Equality::Equal | Equality::NotEqual)
    }

    /// Whether `lhs <op> rhs` holds given `lhs.cmp(rhs)`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Equality::Equal => ordering == Ordering::Equal,
            Equality::NotEqual => ordering != Ordering::Equal,
            Equality::LessThan => ordering == Ordering::Less,
            Equality::LessThanEqual => ordering != Ordering::Greater,
            Equality::GreaterThan => ordering == Ordering::Greater,
            Equality::GreaterThanEqual => ordering != Ordering::Less,
        }
    }

    fn holds_for<T: Ord>(self, lhs: T, rhs: T) -> bool {
        self.holds(lhs.cmp(&rhs))
    }
}

impl fmt::Display for Equality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Equality::Equal => "==",
            Equality::NotEqual => "!=",
            Equality::LessThan => "<",
            Equality::LessThanEqual => "<=",
            Equality::GreaterThan => ">",
            Equality::GreaterThanEqual => ">=",
        };
        f.write_str(s)
    }
}

// ── Filter ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    All,
    None,
    Compartment(CompartmentId),
    Regions(BTreeSet<RegionId>),
    Property {
        property: PersonPropertyId,
        equality: Equality,
        value:    PropertyValue,
    },
    Resource {
        resource: ResourceId,
        equality: Equality,
        amount:   u64,
    },
    GroupMember(GroupId),
    /// Number of groups the person belongs to.
    GroupCount {
        equality: Equality,
        count:    usize,
    },
    /// Number of groups of one type the person belongs to.
    GroupTypeCount {
        group_type: GroupTypeId,
        equality:   Equality,
        count:      usize,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn all() -> Self {
        Filter::All
    }

    pub fn none() -> Self {
        Filter::None
    }

    pub fn compartment(compartment: CompartmentId) -> Self {
        Filter::Compartment(compartment)
    }

    pub fn region(region: RegionId) -> Self {
        Filter::Regions(BTreeSet::from([region]))
    }

    /// People in any of `regions`.
    pub fn regions(regions: impl IntoIterator<Item = RegionId>) -> Self {
        Filter::Regions(regions.into_iter().collect())
    }

    pub fn property(
        property: PersonPropertyId,
        equality: Equality,
        value:    impl Into<PropertyValue>,
    ) -> Self {
        Filter::Property { property, equality, value: value.into() }
    }

    pub fn resource(resource: ResourceId, equality: Equality, amount: u64) -> Self {
        Filter::Resource { resource, equality, amount }
    }

    pub fn group_member(group: GroupId) -> Self {
        Filter::GroupMember(group)
    }

    pub fn group_count(equality: Equality, count: usize) -> Self {
        Filter::GroupCount { equality, count }
    }

    pub fn group_type_count(group_type: GroupTypeId, equality: Equality, count: usize) -> Self {
        Filter::GroupTypeCount { group_type, equality, count }
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    // ── Evaluation ────────────────────────────────────────────────────────

    /// Evaluate for a living person.  Removed or unknown people never match.
    pub fn evaluate(&self, store: &AttributeStore, person: PersonId) -> bool {
        if !store.person_exists(person) {
            return false;
        }
        self.eval(store, person)
    }

    fn eval(&self, store: &AttributeStore, person: PersonId) -> bool {
        match self {
            Filter::All => true,
            Filter::None => false,
            Filter::Compartment(c) => store.person_compartment(person).is_ok_and(|pc| pc == *c),
            Filter::Regions(regions) => store
                .person_region(person)
                .is_ok_and(|r| regions.contains(&r)),
            Filter::Property { property, equality, value } => store
                .person_property(person, *property)
                .is_ok_and(|current| compare_values(*equality, current, value)),
            Filter::Resource { resource, equality, amount } => store
                .person_resource(person, *resource)
                .is_ok_and(|level| equality.holds_for(level, *amount)),
            Filter::GroupMember(group) => store
                .groups_for_person(person)
                .is_ok_and(|groups| groups.binary_search(group).is_ok()),
            Filter::GroupCount { equality, count } => store
                .group_count_for_person(person)
                .is_ok_and(|n| equality.holds_for(n, *count)),
            Filter::GroupTypeCount { group_type, equality, count } => store
                .group_type_count_for_person(person, *group_type)
                .is_ok_and(|n| equality.holds_for(n, *count)),
            Filter::And(a, b) => a.eval(store, person) && b.eval(store, person),
            Filter::Or(a, b) => a.eval(store, person) || b.eval(store, person),
            Filter::Not(inner) => !inner.eval(store, person),
        }
    }

    // ── Validation ────────────────────────────────────────────────────────

    /// Check every id against `universe`, every comparison value against its
    /// property definition, and reject order comparisons against a value
    /// that has no order.
    pub fn validate(&self, universe: &Universe) -> PartitionResult<()> {
        match self {
            Filter::All | Filter::None | Filter::GroupMember(_) | Filter::GroupCount { .. } => {
                Ok(())
            }
            Filter::Compartment(c) => Ok(universe.check_compartment(*c)?),
            Filter::Regions(regions) => {
                for r in regions {
                    universe.check_region(*r)?;
                }
                Ok(())
            }
            Filter::Property { property, equality, value } => {
                let definition = universe.person_property(*property)?;
                definition.check(value).map_err(pk_store::StoreError::from)?;
                if equality.is_order() && !value.is_comparable() {
                    return Err(PartitionError::NonComparableProperty {
                        property: *property,
                        equality: *equality,
                    });
                }
                Ok(())
            }
            Filter::Resource { resource, .. } => {
                universe.resource(*resource)?;
                Ok(())
            }
            Filter::GroupTypeCount { group_type, .. } => {
                universe.group_type(*group_type)?;
                Ok(())
            }
            Filter::And(a, b) | Filter::Or(a, b) => {
                a.validate(universe)?;
                b.validate(universe)
            }
            Filter::Not(inner) => inner.validate(universe),
        }
    }

    /// Append the dimensions this filter reads to `out`.
    pub fn collect_dimensions(&self, out: &mut Vec<Dimension>) {
        match self {
            Filter::All | Filter::None => {}
            Filter::Compartment(_) => out.push(Dimension::Compartment),
            Filter::Regions(_) => out.push(Dimension::Region),
            Filter::Property { property, .. } => out.push(Dimension::PersonProperty(*property)),
            Filter::Resource { resource, .. } => out.push(Dimension::PersonResource(*resource)),
            Filter::GroupMember(_) | Filter::GroupCount { .. } | Filter::GroupTypeCount { .. } => {
                out.push(Dimension::GroupMembership)
            }
            Filter::And(a, b) | Filter::Or(a, b) => {
                a.collect_dimensions(out);
                b.collect_dimensions(out);
            }
            Filter::Not(inner) => inner.collect_dimensions(out),
        }
    }
}

/// Order comparisons across kinds, or involving a NaN double, are false.
fn compare_values(equality: Equality, current: &PropertyValue, target: &PropertyValue) -> bool {
    match equality {
        Equality::Equal => current == target,
        Equality::NotEqual => current != target,
        _ => current.compare(target).is_some_and(|o| equality.holds(o)),
    }
}
