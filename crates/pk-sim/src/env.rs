//! `Environment<P>` — everything a component may read or change.
//!
//! # Mutation pipeline
//!
//! ```text
//! env.set_person_region(p, r)
//!   ① store validates and applies          → Vec<Change>   (error: nothing changed)
//!   ② partitions apply every change        → partition membership deltas
//!   ③ observers, per change then per delta, in component registration order
//! ```
//!
//! Step ③ runs synchronously and may recurse when an observer mutates.  Each
//! nested delivery counts against `SimConfig::max_notification_depth`.
//!
//! # Components on the stack
//!
//! A component is moved out of its slot while one of its callbacks runs.  An
//! event for it raised during that time is queued in its slot and delivered
//! as soon as the callback returns, before control goes back to the caller.

use std::collections::VecDeque;

use pk_core::{
    ComponentId, GroupId, GroupPropertyId, GroupTypeId, Key, Label, PersonId, PersonPropertyId,
    PropertyValue, RegionId, ResourceId, RngStreams, SimConfig, StreamRng, Time,
};
use pk_partition::{LabelSet, Partition, PartitionRegistry, Sampler};
use pk_schedule::{DuePlan, PlanHandle, PlanQueue};
use pk_store::{AttributeStore, Change, PersonSeed};
use rustc_hash::FxHashSet;
use tracing::error;

use crate::component::deliver;
use crate::{
    Component, ComponentKind, Event, EventCategory, OutputHandler, OutputItem, SimError, SimResult,
};

pub(crate) struct Slot<P> {
    pub(crate) kind:      ComponentKind,
    /// `None` while one of the component's callbacks is running.
    pub(crate) component: Option<Box<dyn Component<P>>>,
    subscriptions:        FxHashSet<EventCategory>,
    deferred:             VecDeque<Event>,
}

impl<P> Slot<P> {
    pub(crate) fn new(kind: ComponentKind, component: Box<dyn Component<P>>) -> Self {
        Self {
            kind,
            component:     Some(component),
            subscriptions: FxHashSet::default(),
            deferred:      VecDeque::new(),
        }
    }
}

/// Simulation state and services, passed by `&mut` into every component
/// callback.
pub struct Environment<P> {
    config:     SimConfig,
    store:      AttributeStore,
    plans:      PlanQueue<P>,
    partitions: PartitionRegistry,
    rngs:       RngStreams,
    slots:      Vec<Slot<P>>,
    /// Components whose callbacks are running, innermost last.
    focal:      Vec<ComponentId>,
    depth:      usize,
    halted:     bool,
    output:     Box<dyn OutputHandler>,
}

impl<P> Environment<P> {
    pub(crate) fn new(
        config: SimConfig,
        store:  AttributeStore,
        slots:  Vec<Slot<P>>,
        output: Box<dyn OutputHandler>,
    ) -> Self {
        Self {
            plans: PlanQueue::new(config.start_time),
            rngs: config.make_streams(),
            partitions: PartitionRegistry::new(),
            focal: Vec::new(),
            depth: 0,
            halted: false,
            config,
            store,
            slots,
            output,
        }
    }

    // ── Context ───────────────────────────────────────────────────────────

    /// Current simulation time.
    #[inline]
    pub fn time(&self) -> Time {
        self.plans.now()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Read access to every person, region and group attribute.
    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    /// The component whose callback is running, if any.
    pub fn focal_component(&self) -> Option<ComponentId> {
        self.focal.last().copied()
    }

    pub fn component_kind(&self, component: ComponentId) -> SimResult<ComponentKind> {
        self.slots
            .get(component.index())
            .map(|slot| slot.kind)
            .ok_or(SimError::UnknownComponentId(component))
    }

    pub fn component_count(&self) -> usize {
        self.slots.len()
    }

    /// Stop the run after the current plan; remaining plans are discarded.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Named deterministic random stream.
    pub fn rng(&mut self, id: pk_core::RngId) -> SimResult<&mut StreamRng> {
        Ok(self.rngs.get_mut(id)?)
    }

    /// Hand one output row to the output handler.
    pub fn release_output(&mut self, record: Vec<Label>) -> SimResult<()> {
        let component = self.focal()?;
        let item = OutputItem { time: self.time(), component, record };
        self.output.handle(item)?;
        Ok(())
    }

    // ── Subscriptions ─────────────────────────────────────────────────────

    /// Ask for events of `category` to be delivered to the focal component.
    pub fn subscribe(&mut self, category: EventCategory) -> SimResult<()> {
        let id = self.focal()?;
        self.slots[id.index()].subscriptions.insert(category);
        Ok(())
    }

    pub fn unsubscribe(&mut self, category: &EventCategory) -> SimResult<()> {
        let id = self.focal()?;
        self.slots[id.index()].subscriptions.remove(category);
        Ok(())
    }

    // ── Plans (scoped to the focal component) ─────────────────────────────

    pub fn add_plan(&mut self, plan: P, time: Time) -> SimResult<PlanHandle> {
        let id = self.focal()?;
        Ok(self.plans.push(id, plan, time, None)?)
    }

    /// Schedule a plan retrievable and cancellable through `key` until it is
    /// dispatched.
    pub fn add_keyed_plan(&mut self, plan: P, time: Time, key: Key) -> SimResult<PlanHandle> {
        let id = self.focal()?;
        Ok(self.plans.push(id, plan, time, Some(key))?)
    }

    pub fn get_plan(&self, key: &Key) -> SimResult<Option<&P>> {
        let id = self.focal()?;
        Ok(self.plans.get(id, key)?)
    }

    pub fn get_plan_time(&self, key: &Key) -> SimResult<Option<Time>> {
        let id = self.focal()?;
        Ok(self.plans.time_of(id, key)?)
    }

    /// Remove a pending plan, returning its payload.  `None` if no plan is
    /// pending under `key`.
    pub fn cancel_plan(&mut self, key: &Key) -> SimResult<Option<P>> {
        let id = self.focal()?;
        Ok(self.plans.cancel(id, key)?)
    }

    /// The focal component's pending plan keys in submission order.
    pub fn plan_keys(&self) -> SimResult<Vec<Key>> {
        let id = self.focal()?;
        Ok(self.plans.keys(id))
    }

    pub fn pending_plan_count(&self) -> usize {
        self.plans.len()
    }

    // ── Partitions ────────────────────────────────────────────────────────

    pub fn add_partition(&mut self, key: Key, partition: Partition) -> SimResult<()> {
        Ok(self.partitions.add_partition(key, partition, &self.store)?)
    }

    pub fn remove_partition(&mut self, key: &Key) -> SimResult<()> {
        Ok(self.partitions.remove_partition(key)?)
    }

    pub fn partition_people(&self, key: &Key, query: Option<&LabelSet>) -> SimResult<Vec<PersonId>> {
        Ok(self.partitions.partition_people(key, query)?)
    }

    pub fn partition_size(&self, key: &Key, query: Option<&LabelSet>) -> SimResult<usize> {
        Ok(self.partitions.partition_size(key, query)?)
    }

    pub fn person_in_partition(
        &self,
        person: PersonId,
        key:    &Key,
        query:  Option<&LabelSet>,
    ) -> SimResult<bool> {
        self.store.check_person(person)?;
        Ok(self.partitions.person_in_partition(person, key, query)?)
    }

    pub fn sample_partition(&mut self, key: &Key, sampler: &Sampler) -> SimResult<Option<PersonId>> {
        Ok(self.partitions.sample_partition(key, sampler, &mut self.rngs)?)
    }

    // ── People ────────────────────────────────────────────────────────────

    pub fn add_person(&mut self, seed: &PersonSeed) -> SimResult<PersonId> {
        let (person, change) = self.store.add_person(seed, self.time())?;
        self.propagate(vec![change])?;
        Ok(person)
    }

    /// Remove a person, leaving all its groups first.
    pub fn remove_person(&mut self, person: PersonId) -> SimResult<()> {
        let changes = self.store.remove_person(person)?;
        self.propagate(changes)
    }

    pub fn set_person_compartment(
        &mut self,
        person:      PersonId,
        compartment: pk_core::CompartmentId,
    ) -> SimResult<()> {
        let change = self.store.set_person_compartment(person, compartment, self.time())?;
        self.propagate(vec![change])
    }

    pub fn set_person_region(&mut self, person: PersonId, region: RegionId) -> SimResult<()> {
        let change = self.store.set_person_region(person, region, self.time())?;
        self.propagate(vec![change])
    }

    pub fn set_person_property(
        &mut self,
        person:   PersonId,
        property: PersonPropertyId,
        value:    impl Into<PropertyValue>,
    ) -> SimResult<()> {
        let change = self.store.set_person_property(person, property, value.into(), self.time())?;
        self.propagate(vec![change])
    }

    // ── Resources ─────────────────────────────────────────────────────────

    /// Requires a global component or the region's own component.
    pub fn add_resource_to_region(
        &mut self,
        region:   RegionId,
        resource: ResourceId,
        amount:   u64,
    ) -> SimResult<()> {
        self.require_region_authority(region, "add resources to this region")?;
        let change = self.store.add_resource_to_region(region, resource, amount, self.time())?;
        self.propagate(vec![change])
    }

    /// Requires a global component or the region's own component.
    pub fn remove_resource_from_region(
        &mut self,
        region:   RegionId,
        resource: ResourceId,
        amount:   u64,
    ) -> SimResult<()> {
        self.require_region_authority(region, "remove resources from this region")?;
        let change = self.store.remove_resource_from_region(region, resource, amount, self.time())?;
        self.propagate(vec![change])
    }

    /// Move resources from the person's region to the person.  Requires a
    /// global component or the component of the person's region.
    pub fn transfer_resource_to_person(
        &mut self,
        person:   PersonId,
        resource: ResourceId,
        amount:   u64,
    ) -> SimResult<()> {
        let region = self.store.person_region(person)?;
        self.require_region_authority(region, "hand out this region's resources")?;
        let changes = self.store.transfer_resource_to_person(person, resource, amount, self.time())?;
        self.propagate(changes.into())
    }

    /// Return resources from a person to its region.
    pub fn transfer_resource_from_person(
        &mut self,
        person:   PersonId,
        resource: ResourceId,
        amount:   u64,
    ) -> SimResult<()> {
        let changes = self.store.transfer_resource_from_person(person, resource, amount, self.time())?;
        self.propagate(changes.into())
    }

    /// Consume a person's resources.
    pub fn remove_resource_from_person(
        &mut self,
        person:   PersonId,
        resource: ResourceId,
        amount:   u64,
    ) -> SimResult<()> {
        let change = self.store.remove_resource_from_person(person, resource, amount, self.time())?;
        self.propagate(vec![change])
    }

    /// Requires a global component or the source region's component.
    pub fn transfer_resource_between_regions(
        &mut self,
        from:     RegionId,
        to:       RegionId,
        resource: ResourceId,
        amount:   u64,
    ) -> SimResult<()> {
        self.require_region_authority(from, "move resources out of this region")?;
        let changes =
            self.store.transfer_resource_between_regions(from, to, resource, amount, self.time())?;
        self.propagate(changes.into())
    }

    // ── Groups ────────────────────────────────────────────────────────────

    pub fn add_group(&mut self, group_type: GroupTypeId) -> SimResult<GroupId> {
        let (group, change) = self.store.add_group(group_type)?;
        self.propagate(vec![change])?;
        Ok(group)
    }

    pub fn remove_group(&mut self, group: GroupId) -> SimResult<()> {
        let changes = self.store.remove_group(group)?;
        self.propagate(changes)
    }

    pub fn add_person_to_group(&mut self, person: PersonId, group: GroupId) -> SimResult<()> {
        let change = self.store.add_person_to_group(person, group)?;
        self.propagate(vec![change])
    }

    pub fn remove_person_from_group(&mut self, person: PersonId, group: GroupId) -> SimResult<()> {
        let change = self.store.remove_person_from_group(person, group)?;
        self.propagate(vec![change])
    }

    pub fn set_group_property(
        &mut self,
        group:    GroupId,
        property: GroupPropertyId,
        value:    impl Into<PropertyValue>,
    ) -> SimResult<()> {
        let change = self.store.set_group_property(group, property, value.into())?;
        self.propagate(vec![change])
    }

    // ── Notification ──────────────────────────────────────────────────────

    /// Update partitions for every applied change, then notify observers.
    fn propagate(&mut self, changes: Vec<Change>) -> SimResult<()> {
        let mut events = Vec::with_capacity(changes.len());
        for change in changes {
            let deltas = self.partitions.apply(&self.store, &change)?;
            events.push(Event::Change(change));
            events.extend(deltas.into_iter().map(Event::Partition));
        }
        for event in &events {
            self.notify(event)?;
        }
        Ok(())
    }

    fn notify(&mut self, event: &Event) -> SimResult<()> {
        let categories = event.categories();
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            if !categories.iter().any(|c| slot.subscriptions.contains(c)) {
                continue;
            }
            if slot.component.is_none() {
                slot.deferred.push_back(event.clone());
                continue;
            }
            self.deliver_to(ComponentId(index as u16), event)?;
        }
        Ok(())
    }

    fn deliver_to(&mut self, id: ComponentId, event: &Event) -> SimResult<()> {
        let limit = self.config.max_notification_depth;
        if self.depth >= limit {
            error!(limit, component = %id, "observer notification depth exceeded");
            return Err(SimError::NotificationDepthExceeded { limit });
        }
        self.depth += 1;
        let result = self.with_component(id, |component, env| deliver(component, env, event));
        self.depth -= 1;
        result
    }

    /// Run `f` with component `id` moved out of its slot and marked focal,
    /// then deliver any events queued for it meanwhile.
    pub(crate) fn with_component<F>(&mut self, id: ComponentId, f: F) -> SimResult<()>
    where
        F: FnOnce(&mut dyn Component<P>, &mut Environment<P>) -> SimResult<()>,
    {
        let mut component = self
            .slots
            .get_mut(id.index())
            .ok_or(SimError::UnknownComponentId(id))?
            .component
            .take()
            .ok_or(SimError::UnknownComponentId(id))?;

        self.focal.push(id);
        let result = f(component.as_mut(), self);
        self.focal.pop();
        self.slots[id.index()].component = Some(component);
        if let Err(err) = result {
            // A failed callback forfeits the events it raised against itself.
            self.slots[id.index()].deferred.clear();
            return Err(err);
        }

        while let Some(event) = self.slots[id.index()].deferred.pop_front() {
            if let Err(err) = self.deliver_to(id, &event) {
                self.slots[id.index()].deferred.clear();
                return Err(err);
            }
        }
        Ok(())
    }

    // ── Driver hooks ──────────────────────────────────────────────────────

    pub(crate) fn pop_plan(&mut self) -> Option<DuePlan<P>> {
        if self.halted {
            return None;
        }
        self.plans.pop_next()
    }

    pub(crate) fn plans_dispatched(&self) -> u64 {
        self.plans.dispatched_count()
    }

    pub(crate) fn output_mut(&mut self) -> &mut dyn OutputHandler {
        self.output.as_mut()
    }

    // ── Internal helpers ──────────────────────────────────────────────────

    fn focal(&self) -> SimResult<ComponentId> {
        self.focal_component().ok_or(SimError::NoFocalComponent)
    }

    fn require_region_authority(&self, region: RegionId, action: &'static str) -> SimResult<()> {
        let component = self.focal()?;
        let kind = self.slots[component.index()].kind;
        match kind {
            ComponentKind::Global => Ok(()),
            ComponentKind::Region(r) if r == region => Ok(()),
            _ => Err(SimError::ComponentLacksPermission { component, kind, action }),
        }
    }
}
