//! `LabelSet` — the labels of one bucket, or a query over buckets.

use std::fmt;

use pk_core::{Label, PersonPropertyId, ResourceId};

use crate::Dimension;

/// A binding of some dimensions to labels.
///
/// As a bucket identity every configured dimension of the partition is
/// bound.  As a query only some may be; unbound dimensions match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelSet {
    compartment: Option<Label>,
    region:      Option<Label>,
    group:       Option<Label>,
    /// Sorted by id, at most one entry per id.
    properties:  Vec<(PersonPropertyId, Label)>,
    /// Sorted by id, at most one entry per id.
    resources:   Vec<(ResourceId, Label)>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compartment(mut self, label: impl Into<Label>) -> Self {
        self.compartment = Some(label.into());
        self
    }

    pub fn with_region(mut self, label: impl Into<Label>) -> Self {
        self.region = Some(label.into());
        self
    }

    pub fn with_group(mut self, label: impl Into<Label>) -> Self {
        self.group = Some(label.into());
        self
    }

    pub fn with_property(mut self, property: PersonPropertyId, label: impl Into<Label>) -> Self {
        bind(&mut self.properties, property, label.into());
        self
    }

    pub fn with_resource(mut self, resource: ResourceId, label: impl Into<Label>) -> Self {
        bind(&mut self.resources, resource, label.into());
        self
    }

    pub fn compartment(&self) -> Option<&Label> {
        self.compartment.as_ref()
    }

    pub fn region(&self) -> Option<&Label> {
        self.region.as_ref()
    }

    pub fn group(&self) -> Option<&Label> {
        self.group.as_ref()
    }

    pub fn property(&self, property: PersonPropertyId) -> Option<&Label> {
        lookup(&self.properties, property)
    }

    pub fn resource(&self, resource: ResourceId) -> Option<&Label> {
        lookup(&self.resources, resource)
    }

    pub fn is_empty(&self) -> bool {
        self.compartment.is_none()
            && self.region.is_none()
            && self.group.is_none()
            && self.properties.is_empty()
            && self.resources.is_empty()
    }

    /// Every dimension this set binds.
    pub fn dimensions(&self) -> Vec<Dimension> {
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

    /// `true` if every binding of `query` is bound to the same label here.
    pub fn matches(&self, query: &LabelSet) -> bool {
        agrees(&self.compartment, &query.compartment)
            && agrees(&self.region, &query.region)
            && agrees(&self.group, &query.group)
            && query
                .properties
                .iter()
                .all(|(id, label)| self.property(*id) == Some(label))
            && query
                .resources
                .iter()
                .all(|(id, label)| self.resource(*id) == Some(label))
    }
}

fn bind<I: Ord + Copy>(entries: &mut Vec<(I, Label)>, id: I, label: Label) {
    match entries.binary_search_by(|(e, _)| e.cmp(&id)) {
        Ok(pos) => entries[pos].1 = label,
        Err(pos) => entries.insert(pos, (id, label)),
    }
}

fn lookup<I: Ord + Copy>(entries: &[(I, Label)], id: I) -> Option<&Label> {
    entries
        .binary_search_by(|(e, _)| e.cmp(&id))
        .ok()
        .map(|pos| &entries[pos].1)
}

fn agrees(bucket: &Option<Label>, query: &Option<Label>) -> bool {
    match query {
        None => true,
        Some(q) => bucket.as_ref() == Some(q),
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(l) = &self.compartment {
            parts.push(format!("compartment={l}"));
        }
        if let Some(l) = &self.region {
            parts.push(format!("region={l}"));
        }
        if let Some(l) = &self.group {
            parts.push(format!("group={l}"));
        }
        for (id, l) in &self.properties {
            parts.push(format!("{id}={l}"));
        }
        for (id, l) in &self.resources {
            parts.push(format!("{id}={l}"));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}
