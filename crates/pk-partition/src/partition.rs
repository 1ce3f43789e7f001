//! `Partition` — a filter plus at most one labeling function per dimension.
//!
//! # Example
//!
//! ```rust
//! use pk_core::{Label, PersonPropertyId, PropertyValue};
//! use pk_partition::{Filter, Partition};
//!
//! const AGE: PersonPropertyId = PersonPropertyId(0);
//!
//! // Everyone, split by region and by age band.
//! let by_region_and_band = Partition::new(Filter::all())
//!     .region_label(|r| Label::from(*r))
//!     .property_label(AGE, |age: &PropertyValue| {
//!         Label::Bool(age.as_i64().unwrap_or(0) >= 18)
//!     });
//! # let _ = by_region_and_band;
//! ```

use std::fmt;
use std::sync::Arc;

use pk_core::{
    CompartmentId, Key, Label, PersonId, PersonPropertyId, PropertyValue, RegionId, ResourceId,
};
use pk_store::{AttributeStore, GroupTypeCounts, StoreResult, Universe};

use crate::{Dimension, Filter, LabelSet, PartitionError, PartitionResult};

/// Maps one raw attribute value to a bucket label.
pub type Labeler<T> = Arc<dyn Fn(&T) -> Label + Send + Sync>;

/// Definition of an indexed population.
#[derive(Clone)]
pub struct Partition {
    filter:      Filter,
    compartment: Option<Labeler<CompartmentId>>,
    region:      Option<Labeler<RegionId>>,
    group:       Option<Labeler<GroupTypeCounts>>,
    properties:  Vec<(PersonPropertyId, Labeler<PropertyValue>)>,
    resources:   Vec<(ResourceId, Labeler<u64>)>,
}

impl Partition {
    /// A partition of the people matching `filter`, all in one bucket until
    /// labelers are added.
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            compartment: None,
            region:      None,
            group:       None,
            properties:  Vec::new(),
            resources:   Vec::new(),
        }
    }

    pub fn compartment_label(
        mut self,
        f: impl Fn(&CompartmentId) -> Label + Send + Sync + 'static,
    ) -> Self {
        self.compartment = Some(Arc::new(f));
        self
    }

    pub fn region_label(mut self, f: impl Fn(&RegionId) -> Label + Send + Sync + 'static) -> Self {
        self.region = Some(Arc::new(f));
        self
    }

    /// Label by per-type group membership counts.
    pub fn group_label(
        mut self,
        f: impl Fn(&GroupTypeCounts) -> Label + Send + Sync + 'static,
    ) -> Self {
        self.group = Some(Arc::new(f));
        self
    }

    /// Label by one property; replaces an earlier labeler for the same id.
    pub fn property_label(
        mut self,
        property: PersonPropertyId,
        f: impl Fn(&PropertyValue) -> Label + Send + Sync + 'static,
    ) -> Self {
        self.properties.retain(|(id, _)| *id != property);
        self.properties.push((property, Arc::new(f)));
        self
    }

    /// Label by one resource balance; replaces an earlier labeler for the
    /// same id.
    pub fn resource_label(
        mut self,
        resource: ResourceId,
        f: impl Fn(&u64) -> Label + Send + Sync + 'static,
    ) -> Self {
        self.resources.retain(|(id, _)| *id != resource);
        self.resources.push((resource, Arc::new(f)));
        self
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Dimensions with a labeler.
    pub fn labeled_dimensions(&self) -> Vec<Dimension> {
        let mut out = Vec::new();
        if self.compartment.is_some() {
            out.push(Dimension::Compartment);
        }
        if self.region.is_some() {
            out.push(Dimension::Region);
        }
        if self.group.is_some() {
            out.push(Dimension::GroupMembership);
        }
        out.extend(self.properties.iter().map(|(id, _)| Dimension::PersonProperty(*id)));
        out.extend(self.resources.iter().map(|(id, _)| Dimension::PersonResource(*id)));
        out
    }

    /// Every dimension read by the filter or a labeler, deduplicated.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut out = self.labeled_dimensions();
        self.filter.collect_dimensions(&mut out);
        out.sort();
        out.dedup();
        out
    }

    /// Check the filter and labeler ids against `universe`.
    pub fn validate(&self, universe: &Universe) -> PartitionResult<()> {
        self.filter.validate(universe)?;
        for (id, _) in &self.properties {
            universe.person_property(*id)?;
        }
        for (id, _) in &self.resources {
            universe.resource(*id)?;
        }
        Ok(())
    }

    /// Fail unless every dimension `query` binds has a labeler here.
    pub fn check_query(&self, key: &Key, query: &LabelSet) -> PartitionResult<()> {
        let labeled = self.labeled_dimensions();
        match query.dimensions().into_iter().find(|d| !labeled.contains(d)) {
            Some(dimension) => Err(PartitionError::IncompatiblePopulationPartitionQuery {
                key: key.clone(),
                dimension,
            }),
            None => Ok(()),
        }
    }

    /// The bucket `person` belongs in, or `None` if the filter rejects it.
    pub fn place(&self, store: &AttributeStore, person: PersonId) -> StoreResult<Option<LabelSet>> {
        if !self.filter.evaluate(store, person) {
            return Ok(None);
        }
        let mut labels = LabelSet::new();
        if let Some(f) = &self.compartment {
            labels = labels.with_compartment(f(&store.person_compartment(person)?));
        }
        if let Some(f) = &self.region {
            labels = labels.with_region(f(&store.person_region(person)?));
        }
        if let Some(f) = &self.group {
            labels = labels.with_group(f(&store.group_type_counts(person)?));
        }
        for (id, f) in &self.properties {
            labels = labels.with_property(*id, f(store.person_property(person, *id)?));
        }
        for (id, f) in &self.resources {
            labels = labels.with_resource(*id, f(&store.person_resource(person, *id)?));
        }
        Ok(Some(labels))
    }
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("filter", &self.filter)
            .field("labeled", &self.labeled_dimensions())
            .finish()
    }
}
