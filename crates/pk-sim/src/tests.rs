//! Integration tests for pk-sim.

use std::sync::{Arc, Mutex};

use pk_core::{
    key, CompartmentId, ComponentId, CoreError, GroupId, GroupTypeId, Key, Label, PersonId,
    PersonPropertyId, PropertyDefinition, PropertyValue, RegionId, ResourceId, RngId, SimConfig,
    Time,
};
use pk_partition::{Filter, Partition, PartitionError, Sampler};
use pk_schedule::PlanError;
use pk_store::{AttributeStore, PersonSeed, StoreBuilder, StoreError, Universe};

use crate::{
    Component, ComponentKind, CsvOutput, Environment, EventCategory, MemoryOutput, OutputHandler,
    OutputItem, Sim, SimBuilder, SimError, SimResult,
};

type Plan = u32;
type Log = Arc<Mutex<Vec<String>>>;

type InitFn = Box<dyn FnMut(&mut Environment<Plan>) -> SimResult<()>>;
type PlanFn = Box<dyn FnMut(&mut Environment<Plan>, Plan) -> SimResult<()>>;
type ObserveFn = Box<dyn FnMut(&mut Environment<Plan>, &str) -> SimResult<()>>;

const S: CompartmentId = CompartmentId(0);
const I: CompartmentId = CompartmentId(1);
const R0: RegionId = RegionId(0);
const R1: RegionId = RegionId(1);
const DOSES: ResourceId = ResourceId(0);
const VACCINATED: PersonPropertyId = PersonPropertyId(0);
const HOUSEHOLD: GroupTypeId = GroupTypeId(0);

// ── Helpers ───────────────────────────────────────────────────────────────────

fn universe() -> Universe {
    Universe::builder()
        .compartments(2)
        .regions(2)
        .resources(1)
        .person_property(PropertyDefinition::new(false))
        .group_type(vec![])
        .build()
}

/// Person `i` lives in region `i % 2`, susceptible.
fn store_with(n: usize) -> AttributeStore {
    StoreBuilder::new(universe())
        .people((0..n).map(|i| PersonSeed::new(S, RegionId((i % 2) as u16))))
        .build()
        .unwrap()
}

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn lines(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn infected_key() -> Key {
    Key::from("infected")
}

/// A component whose behavior is supplied as closures.  Every callback that
/// reaches it is appended to the shared log as `"<name> <what>"`.
struct Script {
    name:    &'static str,
    log:     Log,
    init:    InitFn,
    plan:    PlanFn,
    observe: ObserveFn,
    events:  Vec<EventCategory>,
}

impl Script {
    fn new(name: &'static str, log: &Log) -> Self {
        let plan_log = log.clone();
        Self {
            name,
            log: log.clone(),
            init: Box::new(|_| Ok(())),
            plan: Box::new(move |env, plan| {
                plan_log.lock().unwrap().push(format!("{name} plan {plan} @{}", env.time().0));
                Ok(())
            }),
            observe: Box::new(|_, _| Ok(())),
            events: Vec::new(),
        }
    }

    fn subscribed(mut self, category: EventCategory) -> Self {
        self.events.push(category);
        self
    }

    fn on_init(mut self, f: impl FnMut(&mut Environment<Plan>) -> SimResult<()> + 'static) -> Self {
        self.init = Box::new(f);
        self
    }

    fn on_plan(
        mut self,
        f: impl FnMut(&mut Environment<Plan>, Plan) -> SimResult<()> + 'static,
    ) -> Self {
        self.plan = Box::new(f);
        self
    }

    fn on_observe(
        mut self,
        f: impl FnMut(&mut Environment<Plan>, &str) -> SimResult<()> + 'static,
    ) -> Self {
        self.observe = Box::new(f);
        self
    }

    fn record(&mut self, env: &mut Environment<Plan>, what: String) -> SimResult<()> {
        self.log.lock().unwrap().push(format!("{} {what}", self.name));
        (self.observe)(env, &what)
    }
}

impl Component<Plan> for Script {
    fn init(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
        for category in self.events.drain(..) {
            env.subscribe(category)?;
        }
        (self.init)(env)
    }

    fn execute_plan(&mut self, env: &mut Environment<Plan>, plan: Plan) -> SimResult<()> {
        (self.plan)(env, plan)
    }

    fn close(&mut self, _env: &mut Environment<Plan>) -> SimResult<()> {
        self.log.lock().unwrap().push(format!("{} close", self.name));
        Ok(())
    }

    fn on_person_creation(&mut self, env: &mut Environment<Plan>, person: PersonId) -> SimResult<()> {
        self.record(env, format!("created {}", person.0))
    }

    fn on_person_removal(&mut self, env: &mut Environment<Plan>, person: PersonId) -> SimResult<()> {
        self.record(env, format!("removed {}", person.0))
    }

    fn on_compartment_change(
        &mut self,
        env:    &mut Environment<Plan>,
        person: PersonId,
        from:   CompartmentId,
        to:     CompartmentId,
    ) -> SimResult<()> {
        self.record(env, format!("compartment {} {}->{}", person.0, from.0, to.0))
    }

    fn on_region_change(
        &mut self,
        env:    &mut Environment<Plan>,
        person: PersonId,
        from:   RegionId,
        to:     RegionId,
    ) -> SimResult<()> {
        self.record(env, format!("region {} {}->{}", person.0, from.0, to.0))
    }

    fn on_person_property_change(
        &mut self,
        env:      &mut Environment<Plan>,
        person:   PersonId,
        property: PersonPropertyId,
        previous: &PropertyValue,
        current:  &PropertyValue,
    ) -> SimResult<()> {
        let (p, c) = (previous.as_bool(), current.as_bool());
        self.record(env, format!("property {} {} {p:?}->{c:?}", person.0, property.0))
    }

    fn on_person_resource_change(
        &mut self,
        env:      &mut Environment<Plan>,
        person:   PersonId,
        resource: ResourceId,
        previous: u64,
        current:  u64,
    ) -> SimResult<()> {
        self.record(env, format!("person-resource {} {} {previous}->{current}", person.0, resource.0))
    }

    fn on_region_resource_change(
        &mut self,
        env:      &mut Environment<Plan>,
        region:   RegionId,
        resource: ResourceId,
        previous: u64,
        current:  u64,
    ) -> SimResult<()> {
        self.record(env, format!("region-resource {} {} {previous}->{current}", region.0, resource.0))
    }

    fn on_group_construction(
        &mut self,
        env:        &mut Environment<Plan>,
        group:      GroupId,
        _group_type: GroupTypeId,
    ) -> SimResult<()> {
        self.record(env, format!("group-added {}", group.0))
    }

    fn on_group_destruction(
        &mut self,
        env:        &mut Environment<Plan>,
        group:      GroupId,
        _group_type: GroupTypeId,
    ) -> SimResult<()> {
        self.record(env, format!("group-removed {}", group.0))
    }

    fn on_group_membership_change(
        &mut self,
        env:    &mut Environment<Plan>,
        group:  GroupId,
        person: PersonId,
        joined: bool,
    ) -> SimResult<()> {
        let verb = if joined { "joined" } else { "left" };
        self.record(env, format!("member {} {verb} {}", person.0, group.0))
    }

    fn on_partition_membership_change(
        &mut self,
        env:    &mut Environment<Plan>,
        key:    &Key,
        person: PersonId,
        joined: bool,
    ) -> SimResult<()> {
        let verb = if joined { "joined" } else { "left" };
        self.record(env, format!("partition {key} {} {verb}", person.0))
    }
}

/// Only `execute_plan`; every observer hook keeps its default.
struct Bare(EventCategory);

impl Component<Plan> for Bare {
    fn init(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
        env.subscribe(self.0.clone())
    }

    fn execute_plan(&mut self, _env: &mut Environment<Plan>, _plan: Plan) -> SimResult<()> {
        Ok(())
    }
}

fn sim(people: usize, components: Vec<(ComponentKind, Script)>) -> Sim<Plan> {
    let mut builder = SimBuilder::new(SimConfig::new(42), store_with(people));
    for (kind, component) in components {
        builder = builder.component(kind, component);
    }
    builder.build().unwrap()
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use super::*;

    #[test]
    fn components_get_registration_ids() {
        let log = new_log();
        let sim = sim(2, vec![
            (ComponentKind::Global, Script::new("a", &log)),
            (ComponentKind::Region(R1), Script::new("b", &log)),
        ]);
        assert_eq!(sim.env().component_count(), 2);
        assert_eq!(sim.env().component_kind(ComponentId(1)).unwrap(), ComponentKind::Region(R1));
        assert!(matches!(
            sim.env().component_kind(ComponentId(2)),
            Err(SimError::UnknownComponentId(ComponentId(2)))
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimConfig::new(1);
        config.max_notification_depth = 0;
        let result = SimBuilder::<Plan>::new(config, store_with(1)).build();
        assert!(matches!(result, Err(SimError::Core(CoreError::Config(_)))));
    }

    #[test]
    fn component_for_unknown_region_is_rejected() {
        let log = new_log();
        let result = SimBuilder::new(SimConfig::new(1), store_with(1))
            .component(ComponentKind::Region(RegionId(9)), Script::new("a", &log))
            .build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn empty_run_opens_and_closes() {
        let log = new_log();
        let output = MemoryOutput::new();
        let mut sim = SimBuilder::new(SimConfig::new(1), store_with(0))
            .component(ComponentKind::Global, Script::new("a", &log))
            .output(output.clone())
            .build()
            .unwrap();
        let summary = sim.run().unwrap();
        assert_eq!(summary.plans_dispatched, 0);
        assert_eq!(summary.end_time, Time::ZERO);
        assert!(!summary.halted);
        assert_eq!(lines(&log), vec!["a close"]);
        assert!(output.was_closed());
    }
}

// ── Plans ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod plans {
    use super::*;

    #[test]
    fn equal_times_run_in_submission_order() {
        let log = new_log();
        let a = Script::new("a", &log).on_init(|env| {
            env.add_plan(1, Time(5.0))?;
            env.add_plan(2, Time(3.0))?;
            env.add_plan(3, Time(5.0))?;
            Ok(())
        });
        let b = Script::new("b", &log).on_init(|env| {
            env.add_plan(4, Time(5.0))?;
            Ok(())
        });
        let summary = sim(0, vec![(ComponentKind::Global, a), (ComponentKind::Global, b)])
            .run()
            .unwrap();

        assert_eq!(summary.plans_dispatched, 4);
        assert_eq!(summary.end_time, Time(5.0));
        assert_eq!(lines(&log), vec![
            "a plan 2 @3", "a plan 1 @5", "a plan 3 @5", "b plan 4 @5", "a close", "b close",
        ]);
    }

    #[test]
    fn cancelled_plan_never_runs() {
        let log = new_log();
        let plan_log = log.clone();
        let a = Script::new("a", &log)
            .on_init(|env| {
                env.add_keyed_plan(1, Time(2.0), key!["a"])?;
                env.add_keyed_plan(2, Time(4.0), key!["b"])?;
                env.add_plan(3, Time(1.0))?;
                Ok(())
            })
            .on_plan(move |env, plan| {
                if plan == 3 {
                    assert_eq!(env.get_plan(&key!["a"])?, Some(&1));
                    assert_eq!(env.get_plan_time(&key!["a"])?, Some(Time(2.0)));
                    assert_eq!(env.cancel_plan(&key!["a"])?, Some(1));
                    assert_eq!(env.cancel_plan(&key!["a"])?, None);
                    assert_eq!(env.plan_keys()?, vec![key!["b"]]);
                }
                plan_log.lock().unwrap().push(format!("plan {plan}"));
                Ok(())
            });
        sim(0, vec![(ComponentKind::Global, a)]).run().unwrap();
        assert_eq!(lines(&log), vec!["plan 3", "plan 2", "a close"]);
    }

    #[test]
    fn keys_are_scoped_to_the_owner() {
        let log = new_log();
        let a = Script::new("a", &log).on_init(|env| env.add_keyed_plan(1, Time(1.0), key!["x"]).map(|_| ()));
        let b = Script::new("b", &log).on_init(|env| {
            assert_eq!(env.get_plan(&key!["x"])?, None);
            env.add_keyed_plan(2, Time(1.0), key!["x"]).map(|_| ())
        });
        let summary = sim(0, vec![(ComponentKind::Global, a), (ComponentKind::Global, b)])
            .run()
            .unwrap();
        assert_eq!(summary.plans_dispatched, 2);
    }

    #[test]
    fn duplicate_and_null_keys_are_refused() {
        let log = new_log();
        let a = Script::new("a", &log).on_init(|env| {
            env.add_keyed_plan(1, Time(1.0), key!["x"])?;
            assert!(matches!(
                env.add_keyed_plan(2, Time(2.0), key!["x"]),
                Err(SimError::Plan(PlanError::DuplicatePlanKey { .. }))
            ));
            assert!(matches!(
                env.add_keyed_plan(2, Time(2.0), Key::null()),
                Err(SimError::Plan(PlanError::NullPlanKey))
            ));
            Ok(())
        });
        sim(0, vec![(ComponentKind::Global, a)]).run().unwrap();
    }

    #[test]
    fn past_plan_aborts_the_run() {
        let log = new_log();
        let a = Script::new("a", &log)
            .on_init(|env| env.add_plan(1, Time(5.0)).map(|_| ()))
            .on_plan(|env, _| env.add_plan(2, Time(1.0)).map(|_| ()));
        let result = sim(0, vec![(ComponentKind::Global, a)]).run();
        assert!(matches!(result, Err(SimError::Plan(PlanError::PastPlanningTime { .. }))));
        // Components are not closed after a failure.
        assert!(lines(&log).is_empty());
    }

    #[test]
    fn plan_calls_need_a_running_component() {
        let mut sim = sim(0, vec![]);
        assert!(matches!(sim.env_mut().add_plan(1, Time(1.0)), Err(SimError::NoFocalComponent)));
        assert!(matches!(sim.env().plan_keys(), Err(SimError::NoFocalComponent)));
    }

    #[test]
    fn halt_discards_remaining_plans() {
        let log = new_log();
        let a = Script::new("a", &log)
            .on_init(|env| {
                for t in 1..=3 {
                    env.add_plan(t, Time(t as f64))?;
                }
                Ok(())
            })
            .on_plan(|env, plan| {
                if plan == 2 {
                    env.halt();
                }
                Ok(())
            });
        let mut sim = sim(0, vec![(ComponentKind::Global, a)]);
        let summary = sim.run().unwrap();
        assert!(summary.halted);
        assert_eq!(summary.plans_dispatched, 2);
        assert_eq!(summary.end_time, Time(2.0));
        assert_eq!(lines(&log), vec!["a close"]);
    }

    #[test]
    fn undeclared_rng_is_refused() {
        let log = new_log();
        let a = Script::new("a", &log).on_init(|env| {
            let draw = env.rng(RngId(0))?.uniform();
            assert!((0.0..1.0).contains(&draw));
            assert!(matches!(
                env.rng(RngId(7)),
                Err(SimError::Core(CoreError::UnknownRandomNumberGeneratorId(RngId(7))))
            ));
            Ok(())
        });
        sim(0, vec![(ComponentKind::Global, a)]).run().unwrap();
    }
}

// ── Observers ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observers {
    use super::*;

    /// A global component that runs `f` as its only plan, at time 1.
    fn driver(log: &Log, f: impl FnMut(&mut Environment<Plan>) -> SimResult<()> + 'static) -> Script {
        let mut f = f;
        Script::new("driver", log)
            .on_init(|env| env.add_plan(0, Time(1.0)).map(|_| ()))
            .on_plan(move |env, _| f(env))
    }

    fn observed(log: &Log) -> Vec<String> {
        lines(log).into_iter().filter(|l| !l.ends_with("close")).collect()
    }

    #[test]
    fn registration_order_and_category_scoping() {
        let log = new_log();
        let mover = driver(&log, |env| env.set_person_region(PersonId(0), R1));
        let b = Script::new("b", &log).subscribed(EventCategory::RegionArrival(R1));
        let c = Script::new("c", &log)
            .subscribed(EventCategory::RegionDeparture(R0))
            .subscribed(EventCategory::RegionArrival(R1));
        let d = Script::new("d", &log).subscribed(EventCategory::CompartmentArrival(I));
        sim(2, vec![
            (ComponentKind::Global, mover),
            (ComponentKind::Global, b),
            (ComponentKind::Global, c),
            (ComponentKind::Global, d),
        ])
        .run()
        .unwrap();

        assert_eq!(observed(&log), vec!["b region 0 0->1", "c region 0 0->1"]);
    }

    #[test]
    fn missing_hook_aborts_the_run() {
        let log = new_log();
        let adder = driver(&log, |env| env.add_person(&PersonSeed::new(S, R0)).map(|_| ()));
        let mut sim = SimBuilder::new(SimConfig::new(1), store_with(0))
            .component(ComponentKind::Global, adder)
            .component(ComponentKind::Global, Bare(EventCategory::PersonCreation))
            .build()
            .unwrap();
        assert!(matches!(sim.run(), Err(SimError::Unimplemented("on_person_creation"))));
    }

    #[test]
    fn failed_observer_drops_its_own_queued_events() {
        let log = new_log();
        let driver = driver(&log, |env| {
            let refused = env.set_person_compartment(PersonId(0), I);
            assert!(matches!(refused, Err(SimError::Component(_))));
            env.set_person_compartment(PersonId(1), I)
        });
        let mut first = true;
        let fickle = Script::new("f", &log)
            .subscribed(EventCategory::CompartmentArrival(I))
            .subscribed(EventCategory::PersonPropertyChange(VACCINATED))
            .on_observe(move |env, what| {
                if !std::mem::take(&mut first) {
                    return Ok(());
                }
                env.set_person_property(PersonId(0), VACCINATED, true)?;
                Err(SimError::Component(format!("refused {what}")))
            });
        let mut sim = sim(2, vec![(ComponentKind::Global, driver), (ComponentKind::Global, fickle)]);
        sim.run().unwrap();

        assert_eq!(observed(&log), vec!["f compartment 0 0->1", "f compartment 1 0->1"]);
        let vaccinated = sim.env().store().person_property(PersonId(0), VACCINATED).unwrap();
        assert_eq!(vaccinated.as_bool(), Some(true));
    }

    #[test]
    fn transfer_reports_region_then_person() {
        let log = new_log();
        let mover = driver(&log, |env| {
            env.add_resource_to_region(R0, DOSES, 10)?;
            env.transfer_resource_to_person(PersonId(0), DOSES, 3)
        });
        let watcher = Script::new("w", &log)
            .subscribed(EventCategory::RegionResourceChange(DOSES))
            .subscribed(EventCategory::PersonResourceChange(DOSES));
        sim(1, vec![(ComponentKind::Global, mover), (ComponentKind::Global, watcher)])
            .run()
            .unwrap();

        assert_eq!(observed(&log), vec![
            "w region-resource 0 0 0->10",
            "w region-resource 0 0 10->7",
            "w person-resource 0 0 0->3",
        ]);
    }

    #[test]
    fn removed_person_leaves_groups_first() {
        let log = new_log();
        let mover = driver(&log, |env| {
            let g = env.add_group(HOUSEHOLD)?;
            env.add_person_to_group(PersonId(1), g)?;
            env.remove_person(PersonId(1))?;
            env.remove_group(g)
        });
        let watcher = Script::new("w", &log)
            .subscribed(EventCategory::GroupConstruction)
            .subscribed(EventCategory::GroupDestruction)
            .subscribed(EventCategory::GroupMembershipChange)
            .subscribed(EventCategory::PersonRemoval);
        sim(2, vec![(ComponentKind::Global, mover), (ComponentKind::Global, watcher)])
            .run()
            .unwrap();

        assert_eq!(observed(&log), vec![
            "w group-added 0",
            "w member 1 joined 0",
            "w member 1 left 0",
            "w removed 1",
            "w group-removed 0",
        ]);
    }

    #[test]
    fn own_events_arrive_after_the_callback() {
        let log = new_log();
        let plan_log = log.clone();
        let a = Script::new("a", &log)
            .subscribed(EventCategory::RegionArrival(R1))
            .on_init(|env| env.add_plan(0, Time(1.0)).map(|_| ()))
            .on_plan(move |env, _| {
                env.set_person_region(PersonId(0), R1)?;
                plan_log.lock().unwrap().push("a moved".to_owned());
                Ok(())
            });
        let b = Script::new("b", &log).subscribed(EventCategory::RegionArrival(R1));
        sim(1, vec![(ComponentKind::Global, a), (ComponentKind::Global, b)])
            .run()
            .unwrap();

        // `b` sees the move synchronously; `a` only after its plan returns.
        assert_eq!(observed(&log), vec!["b region 0 0->1", "a moved", "a region 0 0->1"]);
    }

    #[test]
    fn observer_mutations_cascade_synchronously() {
        let log = new_log();
        let mover = driver(&log, |env| env.set_person_compartment(PersonId(0), I));
        let vaccinator = Script::new("v", &log)
            .subscribed(EventCategory::CompartmentArrival(I))
            .on_observe(|env, _| env.set_person_property(PersonId(0), VACCINATED, true));
        let watcher = Script::new("w", &log)
            .subscribed(EventCategory::PersonPropertyChange(VACCINATED))
            .subscribed(EventCategory::CompartmentArrival(I));
        sim(1, vec![
            (ComponentKind::Global, mover),
            (ComponentKind::Global, vaccinator),
            (ComponentKind::Global, watcher),
        ])
        .run()
        .unwrap();

        assert_eq!(observed(&log), vec![
            "v compartment 0 0->1",
            "w property 0 0 Some(false)->Some(true)",
            "w compartment 0 0->1",
        ]);
    }

    #[test]
    fn runaway_cascade_hits_the_depth_limit() {
        let log = new_log();
        let mover = driver(&log, |env| env.set_person_compartment(PersonId(0), I));
        let flipper = Script::new("f", &log)
            .subscribed(EventCategory::CompartmentArrival(I))
            .subscribed(EventCategory::CompartmentArrival(S))
            .on_observe(|env, _| {
                let now = env.store().person_compartment(PersonId(0))?;
                env.set_person_compartment(PersonId(0), if now == S { I } else { S })
            });
        let mut config = SimConfig::new(1);
        config.max_notification_depth = 8;
        let output = MemoryOutput::new();
        let mut sim = SimBuilder::new(config, store_with(1))
            .component(ComponentKind::Global, mover)
            .component(ComponentKind::Global, flipper)
            .output(output.clone())
            .build()
            .unwrap();

        assert!(matches!(sim.run(), Err(SimError::NotificationDepthExceeded { limit: 8 })));
        assert_eq!(observed(&log).len(), 8);
        assert!(output.was_closed());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let log = new_log();
        let mover = driver(&log, |env| {
            env.set_person_region(PersonId(0), R1)?;
            env.set_person_region(PersonId(0), R0)?;
            env.set_person_region(PersonId(0), R1)
        });
        let once = Script::new("o", &log)
            .subscribed(EventCategory::RegionArrival(R1))
            .on_observe(|env, _| env.unsubscribe(&EventCategory::RegionArrival(R1)));
        sim(1, vec![(ComponentKind::Global, mover), (ComponentKind::Global, once)])
            .run()
            .unwrap();
        assert_eq!(observed(&log), vec!["o region 0 0->1"]);
    }
}

// ── Partitions ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod partitions {
    use super::*;

    fn attach_infected(env: &mut Environment<Plan>) -> SimResult<()> {
        env.add_partition(infected_key(), Partition::new(Filter::compartment(I)))?;
        env.add_plan(0, Time(1.0)).map(|_| ())
    }

    #[test]
    fn partitions_are_current_inside_observers() {
        let log = new_log();
        let mover = Script::new("m", &log)
            .on_init(attach_infected)
            .on_plan(|env, _| env.set_person_compartment(PersonId(1), I));
        let watcher = Script::new("w", &log)
            .subscribed(EventCategory::CompartmentArrival(I))
            .subscribed(EventCategory::PartitionMembership(infected_key()))
            .on_observe(|env, _| {
                assert!(env.person_in_partition(PersonId(1), &infected_key(), None)?);
                assert_eq!(env.partition_size(&infected_key(), None)?, 1);
                Ok(())
            });
        sim(3, vec![(ComponentKind::Global, mover), (ComponentKind::Global, watcher)])
            .run()
            .unwrap();

        let observed: Vec<String> = lines(&log)
            .into_iter()
            .filter(|l| l.starts_with("w ") && !l.ends_with("close"))
            .collect();
        assert_eq!(observed, vec![
            "w compartment 1 0->1".to_owned(),
            format!("w partition {} 1 joined", infected_key()),
        ]);
    }

    #[test]
    fn sample_and_query_through_the_environment() {
        let log = new_log();
        let a = Script::new("a", &log)
            .on_init(attach_infected)
            .on_plan(|env, _| {
                for p in [0, 2] {
                    env.set_person_compartment(PersonId(p), I)?;
                }
                assert_eq!(env.partition_people(&infected_key(), None)?, vec![PersonId(0), PersonId(2)]);

                let only_two = Sampler::new(RngId(0)).excluding(PersonId(0));
                assert_eq!(env.sample_partition(&infected_key(), &only_two)?, Some(PersonId(2)));

                assert!(matches!(
                    env.sample_partition(&infected_key(), &Sampler::new(RngId(5))),
                    Err(SimError::Partition(PartitionError::Core(
                        CoreError::UnknownRandomNumberGeneratorId(RngId(5))
                    )))
                ));

                env.remove_partition(&infected_key())?;
                assert!(matches!(
                    env.partition_size(&infected_key(), None),
                    Err(SimError::Partition(PartitionError::UnknownPopulationPartitionKey(_)))
                ));
                Ok(())
            });
        sim(3, vec![(ComponentKind::Global, a)]).run().unwrap();
    }

    #[test]
    fn resource_filter_tracks_balance_and_compartment() {
        use pk_partition::Equality;

        const C1: CompartmentId = CompartmentId(0);
        const C2: CompartmentId = CompartmentId(1);
        const R3: ResourceId = ResourceId(2);

        // One person per (compartment, region) pair on a 5 x 5 grid.
        let universe = Universe::builder().compartments(5).regions(5).resources(5).build();
        let store = StoreBuilder::new(universe)
            .people((0..25u16).map(|i| PersonSeed::new(CompartmentId(i / 5), RegionId(i % 5))))
            .build()
            .unwrap();
        let stocked = key!["stocked"];
        let target = PersonId(2);

        let log = new_log();
        let k = stocked.clone();
        let a = Script::new("a", &log).on_init(move |env| {
            let filter = Filter::compartment(C1).and(Filter::resource(R3, Equality::GreaterThanEqual, 3));
            env.add_partition(k.clone(), Partition::new(filter))?;
            assert!(env.partition_people(&k, None)?.is_empty());

            let region = env.store().person_region(target)?;
            env.add_resource_to_region(region, R3, 3)?;
            env.transfer_resource_to_person(target, R3, 2)?;
            assert!(env.partition_people(&k, None)?.is_empty());
            env.transfer_resource_to_person(target, R3, 1)?;
            assert_eq!(env.partition_people(&k, None)?, vec![target]);

            env.set_person_compartment(target, C2)?;
            assert_eq!(env.store().person_resource(target, R3)?, 3);
            assert!(env.partition_people(&k, None)?.is_empty());
            Ok(())
        });
        let mut sim = SimBuilder::new(SimConfig::new(7), store)
            .component(ComponentKind::Global, a)
            .build()
            .unwrap();
        sim.run().unwrap();
        assert!(!sim.env().person_in_partition(target, &stocked, None).unwrap());
    }

    #[test]
    fn duplicate_partition_key_is_refused() {
        let log = new_log();
        let a = Script::new("a", &log).on_init(|env| {
            env.add_partition(infected_key(), Partition::new(Filter::all()))?;
            assert!(matches!(
                env.add_partition(infected_key(), Partition::new(Filter::all())),
                Err(SimError::Partition(PartitionError::DuplicateIndexedPopulation(_)))
            ));
            Ok(())
        });
        sim(1, vec![(ComponentKind::Global, a)]).run().unwrap();
    }
}

// ── Resources and permissions ─────────────────────────────────────────────────

#[cfg(test)]
mod resources {
    use super::*;

    #[test]
    fn region_component_may_only_touch_its_own_region() {
        let log = new_log();
        let clinic = Script::new("c", &log).on_init(|env| {
            env.add_resource_to_region(R1, DOSES, 5)?;
            assert!(matches!(
                env.add_resource_to_region(R0, DOSES, 5),
                Err(SimError::ComponentLacksPermission {
                    kind: ComponentKind::Region(R1),
                    ..
                })
            ));
            // Person 0 lives in R0, person 1 in R1.
            env.transfer_resource_to_person(PersonId(1), DOSES, 2)?;
            assert!(matches!(
                env.transfer_resource_to_person(PersonId(0), DOSES, 1),
                Err(SimError::ComponentLacksPermission { .. })
            ));
            assert!(matches!(
                env.transfer_resource_between_regions(R0, R1, DOSES, 1),
                Err(SimError::ComponentLacksPermission { .. })
            ));
            env.transfer_resource_between_regions(R1, R0, DOSES, 1)?;
            Ok(())
        });
        let mut sim = sim(2, vec![(ComponentKind::Region(R1), clinic)]);
        sim.run().unwrap();

        let store = sim.env().store();
        assert_eq!(store.region_resource(R1, DOSES).unwrap(), 2);
        assert_eq!(store.region_resource(R0, DOSES).unwrap(), 1);
        assert_eq!(store.person_resource(PersonId(1), DOSES).unwrap(), 2);
    }

    #[test]
    fn compartment_component_cannot_add_region_resources() {
        let log = new_log();
        let ward = Script::new("w", &log).on_init(|env| env.add_resource_to_region(R0, DOSES, 1));
        let result = sim(1, vec![(ComponentKind::Compartment(I), ward)]).run();
        assert!(matches!(result, Err(SimError::ComponentLacksPermission { .. })));
    }

    #[test]
    fn people_may_use_and_return_their_resources() {
        let log = new_log();
        let a = Script::new("a", &log).on_init(|env| {
            env.add_resource_to_region(R0, DOSES, 10)?;
            env.transfer_resource_to_person(PersonId(0), DOSES, 4)?;
            env.remove_resource_from_person(PersonId(0), DOSES, 1)?;
            env.transfer_resource_from_person(PersonId(0), DOSES, 3)
        });
        let mut sim = sim(1, vec![(ComponentKind::Global, a)]);
        sim.run().unwrap();
        assert_eq!(sim.env().store().region_resource(R0, DOSES).unwrap(), 9);
        assert_eq!(sim.env().store().person_resource(PersonId(0), DOSES).unwrap(), 0);
    }

    #[test]
    fn overflow_leaves_balance_and_observers_untouched() {
        let log = new_log();
        let a = Script::new("a", &log).on_init(|env| {
            env.add_resource_to_region(R0, DOSES, u64::MAX - 5)?;
            assert!(matches!(
                env.add_resource_to_region(R0, DOSES, 10),
                Err(SimError::Store(StoreError::ResourceArithmetic { .. }))
            ));
            assert_eq!(env.store().region_resource(R0, DOSES)?, u64::MAX - 5);
            Ok(())
        });
        // Registered first so its subscription is live before `a` initializes.
        let watcher = Script::new("w", &log).subscribed(EventCategory::RegionResourceChange(DOSES));
        sim(0, vec![(ComponentKind::Global, watcher), (ComponentKind::Global, a)])
            .run()
            .unwrap();

        let seen: Vec<String> = lines(&log).into_iter().filter(|l| l.starts_with("w region")).collect();
        assert_eq!(seen, vec![format!("w region-resource 0 0 0->{}", u64::MAX - 5)]);
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod output {
    use super::*;

    #[test]
    fn released_items_carry_time_and_component() {
        let log = new_log();
        let output = MemoryOutput::new();
        let reporter = Script::new("r", &log)
            .on_init(|env| env.add_plan(0, Time(2.5)).map(|_| ()))
            .on_plan(|env, _| env.release_output(vec![Label::from("count"), Label::Int(3)]));
        let mut sim = SimBuilder::new(SimConfig::new(1), store_with(0))
            .component(ComponentKind::Global, Script::new("idle", &log))
            .component(ComponentKind::Global, reporter)
            .output(output.clone())
            .build()
            .unwrap();
        sim.run().unwrap();

        assert_eq!(output.items(), vec![OutputItem {
            time:      Time(2.5),
            component: ComponentId(1),
            record:    vec![Label::from("count"), Label::Int(3)],
        }]);
        assert!(output.was_closed());
        assert!(!output.is_open());
    }

    #[test]
    fn output_is_closed_when_the_run_aborts() {
        let log = new_log();
        let output = MemoryOutput::new();
        let failing = Script::new("f", &log)
            .on_init(|env| env.add_plan(0, Time(1.0)).map(|_| ()))
            .on_plan(|_, _| Err(SimError::Component("boom".to_owned())));
        let mut sim = SimBuilder::new(SimConfig::new(1), store_with(0))
            .component(ComponentKind::Global, failing)
            .output(output.clone())
            .build()
            .unwrap();

        assert!(matches!(sim.run(), Err(SimError::Component(m)) if m == "boom"));
        assert!(output.was_closed());
    }

    #[test]
    fn csv_rows_may_differ_in_length() {
        let mut csv = CsvOutput::new(Vec::new());
        csv.handle(OutputItem {
            time:      Time(1.5),
            component: ComponentId(0),
            record:    vec![Label::from("a"), Label::Int(3)],
        })
        .unwrap();
        csv.handle(OutputItem {
            time:      Time(2.0),
            component: ComponentId(1),
            record:    vec![Label::Bool(true)],
        })
        .unwrap();
        csv.close().unwrap();

        let text = String::from_utf8(csv.into_inner().unwrap()).unwrap();
        assert_eq!(text, "1.5,0,a,3\n2,1,true\n");
    }
}

// ── Properties ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod ordering {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// Whatever order plans are submitted in, they run in time order,
        /// ties in submission order.
        #[test]
        fn plans_run_in_time_then_submission_order(times in prop::collection::vec(0u8..20, 1..40)) {
            let log = new_log();
            let submitted = times.clone();
            let a = Script::new("a", &log).on_init(move |env| {
                for (i, t) in submitted.iter().enumerate() {
                    env.add_plan(i as Plan, Time(f64::from(*t)))?;
                }
                Ok(())
            });
            let summary = sim(0, vec![(ComponentKind::Global, a)]).run().unwrap();

            let mut expected: Vec<(u8, usize)> = times.iter().copied().zip(0..).collect();
            expected.sort();
            let expected: Vec<String> = expected
                .into_iter()
                .map(|(t, i)| format!("a plan {i} @{t}"))
                .chain(std::iter::once("a close".to_owned()))
                .collect();

            prop_assert_eq!(summary.plans_dispatched, times.len() as u64);
            prop_assert_eq!(lines(&log), expected);
        }
    }
}
