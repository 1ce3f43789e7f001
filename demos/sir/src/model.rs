//! Scenario constants and the three application components.

use tracing::{debug, info};

use pk_core::{
    key, CompartmentId, GroupTypeId, Key, Label, PersonId, PersonPropertyId, PropertyDefinition,
    RegionId, ResourceId, RngId, SimConfig, Time,
};
use pk_partition::{Filter, LabelSet, Partition, Sampler};
use pk_sim::{
    Component, ComponentKind, Environment, EventCategory, OutputHandler, Sim, SimBuilder, SimError,
    SimResult,
};
use pk_store::{AttributeStore, Universe};

// ── Universe ──────────────────────────────────────────────────────────────────

pub const S: CompartmentId = CompartmentId(0);
pub const I: CompartmentId = CompartmentId(1);
pub const R: CompartmentId = CompartmentId(2);

pub const REGIONS: u16 = 3;

pub const VACCINE: ResourceId = ResourceId(0);

pub const AGE: PersonPropertyId = PersonPropertyId(0);
pub const VACCINATED: PersonPropertyId = PersonPropertyId(1);

pub const HOUSEHOLD: GroupTypeId = GroupTypeId(0);

pub const TRANSMISSION: RngId = RngId(0);
pub const CLINIC: RngId = RngId(1);

pub fn universe() -> Universe {
    Universe::builder()
        .compartments(3)
        .regions(REGIONS)
        .resources(1)
        .person_property(PropertyDefinition::new(0i32).immutable())
        .person_property(PropertyDefinition::new(false))
        .group_type(vec![])
        .build()
}

// ── Epidemiology ──────────────────────────────────────────────────────────────

/// Contacts per infectious person per day.
const CONTACT_RATE: f64 = 0.5;
/// Share of contacts made inside the household.
const HOUSEHOLD_SHARE: f64 = 0.4;
const MEAN_INFECTIOUS_DAYS: f64 = 6.0;
const VACCINE_EFFICACY: f64 = 0.8;

const FIRST_DELIVERY_DAY: f64 = 10.0;
const DELIVERY_INTERVAL_DAYS: f64 = 7.0;
const DELIVERIES: u32 = 6;
const DOSES_PER_DELIVERY: u64 = 40;
const DOSES_PER_DAY: u32 = 12;

#[derive(Debug)]
pub enum Plan {
    Contact,
    Recover(PersonId),
    Report,
    Deliver,
    Vaccinate,
}

fn infectious() -> Key {
    key!["infectious"]
}

/// The single pending contact plan.
fn next_contact() -> Key {
    key!["contact"]
}

/// Susceptible people, bucketed by region, vaccination status and
/// whether they are 65 or older.
fn susceptible() -> Key {
    key!["susceptible"]
}

fn is_vaccinated(labels: &LabelSet) -> bool {
    labels.property(VACCINATED) == Some(&Label::Bool(true))
}

/// Exponentially distributed waiting time with the given rate.
fn waiting_time(env: &mut Environment<Plan>, rng: RngId, rate: f64) -> SimResult<f64> {
    env.rng(rng)?
        .exponential(rate)
        .ok_or_else(|| SimError::Component(format!("invalid event rate {rate}")))
}

/// Assemble the outbreak: transmission, daily reporting and one clinic per
/// region, in that registration order.
pub fn build(seed: u64, store: AttributeStore, output: impl OutputHandler + 'static) -> SimResult<Sim<Plan>> {
    let config = SimConfig::new(seed).with_rng(CLINIC);
    let mut builder = SimBuilder::new(config, store)
        .component(ComponentKind::Global, Infection::default())
        .component(ComponentKind::Global, Reporter);
    for region in 0..REGIONS {
        let region = RegionId(region);
        builder = builder.component(ComponentKind::Region(region), Clinic::new(region));
    }
    builder.output(output).build()
}

// ── Infection ─────────────────────────────────────────────────────────────────

/// Drives transmission and recovery.  Owns both population partitions.
#[derive(Default)]
pub struct Infection {
    infections: u64,
}

impl Infection {
    /// Replace the pending contact with one drawn at the current total
    /// contact rate.  Called whenever the infectious count changes.
    fn reschedule_contact(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
        env.cancel_plan(&next_contact())?;
        let infectious = env.partition_size(&infectious(), None)?;
        if infectious == 0 {
            return Ok(());
        }
        let dt = waiting_time(env, TRANSMISSION, CONTACT_RATE * infectious as f64)?;
        env.add_keyed_plan(Plan::Contact, env.time().after(dt), next_contact())?;
        Ok(())
    }

    fn household_contact(&self, env: &mut Environment<Plan>, source: PersonId) -> SimResult<Option<PersonId>> {
        let store = env.store();
        let mut candidates = Vec::new();
        for &group in store.groups_for_person(source)? {
            for &member in store.group_members(group)? {
                if member != source && store.person_compartment(member)? == S {
                    candidates.push(member);
                }
            }
        }
        let Some(&target) = env.rng(TRANSMISSION)?.pick(&candidates) else {
            return Ok(None);
        };
        let protected = env.store().person_property(target, VACCINATED)?.as_bool() == Some(true);
        if protected && env.rng(TRANSMISSION)?.chance(VACCINE_EFFICACY) {
            return Ok(None);
        }
        Ok(Some(target))
    }

    fn community_contact(&self, env: &mut Environment<Plan>, source: PersonId) -> SimResult<Option<PersonId>> {
        let region = env.store().person_region(source)?;
        let sampler = Sampler::new(TRANSMISSION)
            .within(LabelSet::new().with_region(region))
            .weighted(|labels| if is_vaccinated(labels) { 1.0 - VACCINE_EFFICACY } else { 1.0 });
        env.sample_partition(&susceptible(), &sampler)
    }

    fn contact(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
        let Some(source) = env.sample_partition(&infectious(), &Sampler::new(TRANSMISSION))? else {
            return Ok(());
        };
        let at_home = env.rng(TRANSMISSION)?.chance(HOUSEHOLD_SHARE);
        let target = if at_home {
            self.household_contact(env, source)?
        } else {
            self.community_contact(env, source)?
        };
        match target {
            // The arrival in I reschedules the next contact.
            Some(target) => {
                debug!(%source, %target, at_home, "transmission");
                self.infections += 1;
                env.set_person_compartment(target, I)
            }
            None => self.reschedule_contact(env),
        }
    }

    fn recover(&mut self, env: &mut Environment<Plan>, person: PersonId) -> SimResult<()> {
        env.set_person_compartment(person, R)?;
        self.reschedule_contact(env)
    }
}

impl Component<Plan> for Infection {
    fn init(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
        env.add_partition(infectious(), Partition::new(Filter::compartment(I)))?;
        env.add_partition(
            susceptible(),
            Partition::new(Filter::compartment(S))
                .region_label(|r| Label::from(*r))
                .property_label(VACCINATED, |v| Label::from(v.as_bool() == Some(true)))
                .property_label(AGE, |v| Label::from(v.as_i64().unwrap_or(0) >= 65)),
        )?;
        env.subscribe(EventCategory::CompartmentArrival(I))?;

        for person in env.partition_people(&infectious(), None)? {
            let dt = waiting_time(env, TRANSMISSION, 1.0 / MEAN_INFECTIOUS_DAYS)?;
            env.add_plan(Plan::Recover(person), env.time().after(dt))?;
        }
        self.reschedule_contact(env)
    }

    fn execute_plan(&mut self, env: &mut Environment<Plan>, plan: Plan) -> SimResult<()> {
        match plan {
            Plan::Contact => self.contact(env),
            Plan::Recover(person) => self.recover(env, person),
            other => Err(SimError::Component(format!("infection cannot run {other:?}"))),
        }
    }

    fn close(&mut self, _env: &mut Environment<Plan>) -> SimResult<()> {
        info!(infections = self.infections, "transmission finished");
        Ok(())
    }

    fn on_compartment_change(
        &mut self,
        env:    &mut Environment<Plan>,
        person: PersonId,
        _from:  CompartmentId,
        _to:    CompartmentId,
    ) -> SimResult<()> {
        let dt = waiting_time(env, TRANSMISSION, 1.0 / MEAN_INFECTIOUS_DAYS)?;
        env.add_plan(Plan::Recover(person), env.time().after(dt))?;
        self.reschedule_contact(env)
    }
}

// ── Clinic ────────────────────────────────────────────────────────────────────

/// Receives vaccine shipments for one region and vaccinates its susceptible
/// residents, older residents first.
pub struct Clinic {
    region:     RegionId,
    deliveries: u32,
    doses_used: u64,
}

impl Clinic {
    pub fn new(region: RegionId) -> Self {
        Self { region, deliveries: 0, doses_used: 0 }
    }

    fn deliver(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
        env.add_resource_to_region(self.region, VACCINE, DOSES_PER_DELIVERY)?;
        self.deliveries += 1;
        if self.deliveries < DELIVERIES {
            env.add_plan(Plan::Deliver, env.time().after(DELIVERY_INTERVAL_DAYS))?;
        }
        if env.get_plan(&key!["vaccinate"])?.is_none() {
            env.add_keyed_plan(Plan::Vaccinate, env.time(), key!["vaccinate"])?;
        }
        Ok(())
    }

    fn vaccinate(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
        let sampler = Sampler::new(CLINIC)
            .within(LabelSet::new().with_region(self.region).with_property(VACCINATED, false))
            .weighted(|labels| if labels.property(AGE) == Some(&Label::Bool(true)) { 4.0 } else { 1.0 });

        for _ in 0..DOSES_PER_DAY {
            if env.store().region_resource(self.region, VACCINE)? == 0 {
                return Ok(());
            }
            let Some(person) = env.sample_partition(&susceptible(), &sampler)? else {
                return Ok(());
            };
            env.transfer_resource_to_person(person, VACCINE, 1)?;
            env.remove_resource_from_person(person, VACCINE, 1)?;
            env.set_person_property(person, VACCINATED, true)?;
            self.doses_used += 1;
        }
        env.add_keyed_plan(Plan::Vaccinate, env.time().after(1.0), key!["vaccinate"])?;
        Ok(())
    }
}

impl Component<Plan> for Clinic {
    fn init(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
        env.subscribe(EventCategory::RegionResourceChange(VACCINE))?;
        env.add_plan(Plan::Deliver, Time(FIRST_DELIVERY_DAY))?;
        Ok(())
    }

    fn execute_plan(&mut self, env: &mut Environment<Plan>, plan: Plan) -> SimResult<()> {
        match plan {
            Plan::Deliver => self.deliver(env),
            Plan::Vaccinate => self.vaccinate(env),
            other => Err(SimError::Component(format!("clinic cannot run {other:?}"))),
        }
    }

    fn close(&mut self, _env: &mut Environment<Plan>) -> SimResult<()> {
        info!(region = %self.region, doses = self.doses_used, "clinic closed");
        Ok(())
    }

    fn on_region_resource_change(
        &mut self,
        env:      &mut Environment<Plan>,
        region:   RegionId,
        _resource: ResourceId,
        previous: u64,
        current:  u64,
    ) -> SimResult<()> {
        if region == self.region && previous > 0 && current == 0 {
            info!(region = %region, time = %env.time(), "vaccine stock exhausted");
        }
        Ok(())
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

/// Releases one `day, S, I, R` row per day and halts the run once nobody is
/// infectious.
pub struct Reporter;

impl Component<Plan> for Reporter {
    fn init(&mut self, env: &mut Environment<Plan>) -> SimResult<()> {
        env.add_plan(Plan::Report, env.time())?;
        Ok(())
    }

    fn execute_plan(&mut self, env: &mut Environment<Plan>, _plan: Plan) -> SimResult<()> {
        let store = env.store();
        let counts = [
            store.compartment_population_count(S)? as u64,
            store.compartment_population_count(I)? as u64,
            store.compartment_population_count(R)? as u64,
        ];
        let day = env.time().0.round() as i64;
        if day % 7 == 0 {
            info!(day, s = counts[0], i = counts[1], r = counts[2], "weekly status");
        }

        let mut row = vec![Label::Int(day)];
        row.extend(counts.iter().map(|&n| Label::from(n)));
        env.release_output(row)?;

        if counts[1] == 0 {
            env.halt();
        } else {
            env.add_plan(Plan::Report, env.time().after(1.0))?;
        }
        Ok(())
    }
}
