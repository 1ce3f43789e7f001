//! The `Component` trait — the extension point for model code.

use std::fmt;

use pk_core::{
    CompartmentId, GroupId, GroupPropertyId, GroupTypeId, Key, PersonId, PersonPropertyId,
    PropertyValue, RegionId, ResourceId,
};
use pk_store::Change;

use crate::{Environment, Event, SimError, SimResult};

/// The authority a component acts with.
///
/// Only `Global` components and the owning `Region` component may add or
/// remove a region's resources or hand them out to the region's people.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Global,
    Region(RegionId),
    Compartment(CompartmentId),
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Global => f.write_str("global"),
            ComponentKind::Region(r) => write!(f, "region component for {r}"),
            ComponentKind::Compartment(c) => write!(f, "compartment component for {c}"),
        }
    }
}

/// Pluggable model logic, generic over the plan payload `P`.
///
/// # Required methods
///
/// Only [`execute_plan`][Self::execute_plan] is required.  `init` and `close`
/// default to doing nothing.  Every observer hook defaults to
/// [`SimError::Unimplemented`]; the kernel only calls a hook after the
/// component subscribed to a matching [`EventCategory`](crate::EventCategory)
/// with [`Environment::subscribe`], so a component overrides exactly the
/// hooks it subscribes to.
///
/// # Re-entrancy
///
/// Observers run synchronously inside the mutating call, and may themselves
/// mutate.  A component is never re-entered: an event it caused while one of
/// its own callbacks is running is delivered right after that callback
/// returns.
///
/// # Example
///
/// ```rust,ignore
/// struct Recovery;
///
/// impl Component<Plan> for Recovery {
///     fn init(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
///         env.subscribe(EventCategory::CompartmentArrival(INFECTED))
///     }
///
///     fn execute_plan(&mut self, env: &mut Environment<Plan>, plan: Plan) -> SimResult<()> {
///         env.set_person_compartment(plan.person, RECOVERED)
///     }
///
///     fn on_compartment_change(
///         &mut self, env: &mut Environment<Plan>, person: PersonId,
///         _from: CompartmentId, _to: CompartmentId,
///     ) -> SimResult<()> {
///         env.add_plan(Plan { person }, env.time().after(14.0))?;
///         Ok(())
///     }
/// }
/// ```
pub trait Component<P> {
    /// Called once, in registration order, before the first plan.
    fn init(&mut self, _env: &mut Environment<P>) -> SimResult<()> {
        Ok(())
    }

    /// Called when a plan this component scheduled comes due.
    fn execute_plan(&mut self, env: &mut Environment<P>, plan: P) -> SimResult<()>;

    /// Called once, in registration order, after the last plan.
    fn close(&mut self, _env: &mut Environment<P>) -> SimResult<()> {
        Ok(())
    }

    // ── Observer hooks ────────────────────────────────────────────────────

    fn on_person_creation(&mut self, _env: &mut Environment<P>, _person: PersonId) -> SimResult<()> {
        Err(SimError::Unimplemented("on_person_creation"))
    }

    /// The person's attributes are no longer readable.
    fn on_person_removal(&mut self, _env: &mut Environment<P>, _person: PersonId) -> SimResult<()> {
        Err(SimError::Unimplemented("on_person_removal"))
    }

    fn on_compartment_change(
        &mut self,
        _env:    &mut Environment<P>,
        _person: PersonId,
        _from:   CompartmentId,
        _to:     CompartmentId,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_compartment_change"))
    }

    fn on_region_change(
        &mut self,
        _env:    &mut Environment<P>,
        _person: PersonId,
        _from:   RegionId,
        _to:     RegionId,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_region_change"))
    }

    fn on_person_property_change(
        &mut self,
        _env:      &mut Environment<P>,
        _person:   PersonId,
        _property: PersonPropertyId,
        _previous: &PropertyValue,
        _current:  &PropertyValue,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_person_property_change"))
    }

    fn on_person_resource_change(
        &mut self,
        _env:      &mut Environment<P>,
        _person:   PersonId,
        _resource: ResourceId,
        _previous: u64,
        _current:  u64,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_person_resource_change"))
    }

    fn on_region_resource_change(
        &mut self,
        _env:      &mut Environment<P>,
        _region:   RegionId,
        _resource: ResourceId,
        _previous: u64,
        _current:  u64,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_region_resource_change"))
    }

    fn on_group_construction(
        &mut self,
        _env:        &mut Environment<P>,
        _group:      GroupId,
        _group_type: GroupTypeId,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_group_construction"))
    }

    fn on_group_destruction(
        &mut self,
        _env:        &mut Environment<P>,
        _group:      GroupId,
        _group_type: GroupTypeId,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_group_destruction"))
    }

    fn on_group_membership_change(
        &mut self,
        _env:    &mut Environment<P>,
        _group:  GroupId,
        _person: PersonId,
        _joined: bool,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_group_membership_change"))
    }

    fn on_group_property_change(
        &mut self,
        _env:      &mut Environment<P>,
        _group:    GroupId,
        _property: GroupPropertyId,
        _previous: &PropertyValue,
        _current:  &PropertyValue,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_group_property_change"))
    }

    fn on_partition_membership_change(
        &mut self,
        _env:    &mut Environment<P>,
        _key:    &Key,
        _person: PersonId,
        _joined: bool,
    ) -> SimResult<()> {
        Err(SimError::Unimplemented("on_partition_membership_change"))
    }
}

/// Route `event` to the matching hook of `component`.
pub(crate) fn deliver<P>(
    component: &mut dyn Component<P>,
    env:       &mut Environment<P>,
    event:     &Event,
) -> SimResult<()> {
    match event {
        Event::Change(change) => match change {
            Change::PersonAdded(person) => component.on_person_creation(env, *person),
            Change::PersonRemoved(person) => component.on_person_removal(env, *person),
            Change::Compartment { person, from, to } => {
                component.on_compartment_change(env, *person, *from, *to)
            }
            Change::Region { person, from, to } => {
                component.on_region_change(env, *person, *from, *to)
            }
            Change::PersonProperty { person, property, previous, current } => {
                component.on_person_property_change(env, *person, *property, previous, current)
            }
            Change::PersonResource { person, resource, previous, current } => {
                component.on_person_resource_change(env, *person, *resource, *previous, *current)
            }
            Change::RegionResource { region, resource, previous, current } => {
                component.on_region_resource_change(env, *region, *resource, *previous, *current)
            }
            Change::GroupAdded { group, group_type } => {
                component.on_group_construction(env, *group, *group_type)
            }
            Change::GroupRemoved { group, group_type } => {
                component.on_group_destruction(env, *group, *group_type)
            }
            Change::GroupMembership { group, person, joined } => {
                component.on_group_membership_change(env, *group, *person, *joined)
            }
            Change::GroupProperty { group, property, previous, current } => {
                component.on_group_property_change(env, *group, *property, previous, current)
            }
        },
        Event::Partition(delta) => {
            component.on_partition_membership_change(env, &delta.key, delta.person, delta.joined)
        }
    }
}
