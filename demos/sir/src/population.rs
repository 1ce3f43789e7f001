//! Synthetic population: a CSV template of households, tiled to size.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use pk_core::{PersonId, RegionId};
use pk_store::{AttributeStore, PersonSeed, StoreBuilder, Universe};

use crate::model::{AGE, HOUSEHOLD, I, REGIONS, S};

/// Copies of the template; each copy gets fresh household ids.
const COPIES: u32 = 40;
/// Every this-many-th copy keeps the template's index cases.
const SEEDED_EVERY: u32 = 8;

/// One row per resident.  `household` ids are local to the template.
const TEMPLATE: &str = "\
household,region,age,infected
0,0,34,false
0,0,36,false
0,0,7,false
1,0,71,false
1,0,69,false
2,0,25,true
3,0,44,false
3,0,41,false
3,0,12,false
3,0,9,false
4,1,52,false
4,1,55,false
5,1,19,false
5,1,21,false
5,1,20,false
6,1,80,false
7,1,38,false
7,1,3,false
8,2,29,false
8,2,31,false
8,2,1,false
9,2,66,false
9,2,63,false
10,2,45,false
10,2,15,false
11,2,58,false
";

#[derive(Debug, Deserialize)]
struct Resident {
    household: u32,
    region:    u16,
    age:       i32,
    infected:  bool,
}

fn template() -> Result<Vec<Resident>> {
    let mut reader = csv::Reader::from_reader(TEMPLATE.as_bytes());
    let mut residents = Vec::new();
    for (line, row) in reader.deserialize::<Resident>().enumerate() {
        let resident = row.with_context(|| format!("population template row {}", line + 1))?;
        anyhow::ensure!(
            resident.region < REGIONS,
            "row {}: region {} out of range",
            line + 1,
            resident.region
        );
        residents.push(resident);
    }
    Ok(residents)
}

/// Build the initial store: every resident of every copy, grouped into
/// households.  Copies `0, 8, 16, ...` keep their index cases.
pub fn load(universe: Universe) -> Result<AttributeStore> {
    let residents = template()?;
    let households_per_copy = residents.iter().map(|r| r.household + 1).max().unwrap_or(0);

    let mut seeds = Vec::with_capacity(residents.len() * COPIES as usize);
    let mut households: BTreeMap<u32, Vec<PersonId>> = BTreeMap::new();
    for copy in 0..COPIES {
        for resident in &residents {
            let person = PersonId(u32::try_from(seeds.len())?);
            let compartment = if resident.infected && copy % SEEDED_EVERY == 0 { I } else { S };
            seeds.push(
                PersonSeed::new(compartment, RegionId(resident.region))
                    .with_property(AGE, resident.age),
            );
            households
                .entry(copy * households_per_copy + resident.household)
                .or_default()
                .push(person);
        }
    }

    let mut builder = StoreBuilder::new(universe).people(seeds);
    for members in households.into_values() {
        builder = builder.group(HOUSEHOLD, members);
    }
    builder.build().context("building the initial population")
}
