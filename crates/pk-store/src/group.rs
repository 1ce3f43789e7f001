//! Groups: typed, property-carrying sets of people.
//!
//! A person may belong to any number of groups; a group may hold any number
//! of people.  Both directions are stored so each side is answered without a
//! scan: `GroupRecord::members` keeps join order, the per-person membership
//! list is kept sorted by `GroupId`.

use pk_core::{GroupId, GroupPropertyId, GroupTypeId, PersonId, PropertyValue};

use crate::{AttributeStore, Change, StoreError, StoreResult};

pub(crate) struct GroupRecord {
    pub(crate) group_type: GroupTypeId,
    pub(crate) properties: Vec<PropertyValue>,
    /// Join order.
    pub(crate) members:    Vec<PersonId>,
}

/// Per-group-type membership counts for one person.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupTypeCounts(Vec<usize>);

impl GroupTypeCounts {
    /// Memberships in groups of `group_type` (zero for unknown types).
    pub fn get(&self, group_type: GroupTypeId) -> usize {
        self.0.get(group_type.index()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// `(type, count)` pairs for every declared group type, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupTypeId, usize)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(i, &n)| (GroupTypeId(i as u16), n))
    }
}

impl AttributeStore {
    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Create an empty group with default property values.
    pub fn add_group(&mut self, group_type: GroupTypeId) -> StoreResult<(GroupId, Change)> {
        let properties = self
            .universe()
            .group_type(group_type)?
            .properties
            .iter()
            .map(|def| def.default_value().clone())
            .collect();

        let group = GroupId(self.groups.len() as u32);
        self.groups.push(Some(GroupRecord {
            group_type,
            properties,
            members: Vec::new(),
        }));
        self.group_count += 1;
        Ok((group, Change::GroupAdded { group, group_type }))
    }

    /// Remove a group, releasing its members first.
    ///
    /// Returns one membership removal per member in join order, followed by
    /// [`Change::GroupRemoved`].
    pub fn remove_group(&mut self, group: GroupId) -> StoreResult<Vec<Change>> {
        let record = self
            .groups
            .get_mut(group.index())
            .and_then(Option::take)
            .ok_or(StoreError::UnknownGroupId(group))?;
        self.group_count -= 1;

        let mut changes = Vec::with_capacity(record.members.len() + 1);
        for person in record.members {
            let groups = &mut self.memberships[person.index()];
            if let Ok(pos) = groups.binary_search(&group) {
                groups.remove(pos);
            }
            changes.push(Change::GroupMembership { group, person, joined: false });
        }
        changes.push(Change::GroupRemoved { group, group_type: record.group_type });
        Ok(changes)
    }

    pub fn add_person_to_group(&mut self, person: PersonId, group: GroupId) -> StoreResult<Change> {
        self.check_person(person)?;
        // Field-level borrows: the record and the membership list are disjoint.
        let record = self
            .groups
            .get_mut(group.index())
            .and_then(Option::as_mut)
            .ok_or(StoreError::UnknownGroupId(group))?;
        let groups = &mut self.memberships[person.index()];
        match groups.binary_search(&group) {
            Ok(_) => return Err(StoreError::DuplicateGroupMembership { person, group }),
            Err(pos) => groups.insert(pos, group),
        }
        record.members.push(person);
        Ok(Change::GroupMembership { group, person, joined: true })
    }

    pub fn remove_person_from_group(
        &mut self,
        person: PersonId,
        group:  GroupId,
    ) -> StoreResult<Change> {
        self.check_person(person)?;
        let record = self
            .groups
            .get_mut(group.index())
            .and_then(Option::as_mut)
            .ok_or(StoreError::UnknownGroupId(group))?;
        let groups = &mut self.memberships[person.index()];
        let pos = groups
            .binary_search(&group)
            .map_err(|_| StoreError::NonGroupMember { person, group })?;
        groups.remove(pos);
        record.members.retain(|&m| m != person);
        Ok(Change::GroupMembership { group, person, joined: false })
    }

    pub fn set_group_property(
        &mut self,
        group:    GroupId,
        property: GroupPropertyId,
        value:    PropertyValue,
    ) -> StoreResult<Change> {
        let group_type = self.group_type(group)?;
        let definition = self.universe().group_property(group_type, property)?;
        if !definition.is_mutable() {
            return Err(StoreError::ImmutableGroupProperty(property));
        }
        definition.check(&value)?;

        let record = self.group_record_mut(group)?;
        let previous = std::mem::replace(&mut record.properties[property.index()], value.clone());
        Ok(Change::GroupProperty { group, property, previous, current: value })
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn group_exists(&self, group: GroupId) -> bool {
        matches!(self.groups.get(group.index()), Some(Some(_)))
    }

    /// Number of live groups.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Live groups in ascending id order.
    pub fn group_ids(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_some())
            .map(|(i, _)| GroupId(i as u32))
    }

    pub fn group_type(&self, group: GroupId) -> StoreResult<GroupTypeId> {
        Ok(self.group_record(group)?.group_type)
    }

    /// Members of `group` in join order.
    pub fn group_members(&self, group: GroupId) -> StoreResult<&[PersonId]> {
        Ok(&self.group_record(group)?.members)
    }

    pub fn group_property(
        &self,
        group:    GroupId,
        property: GroupPropertyId,
    ) -> StoreResult<&PropertyValue> {
        let record = self.group_record(group)?;
        record.properties.get(property.index()).ok_or(StoreError::UnknownGroupPropertyId {
            group_type: record.group_type,
            property,
        })
    }

    /// Live groups of `group_type`, ascending.
    pub fn groups_for_group_type(&self, group_type: GroupTypeId) -> StoreResult<Vec<GroupId>> {
        self.universe().group_type(group_type)?;
        Ok(self
            .group_ids()
            .filter(|g| matches!(&self.groups[g.index()], Some(r) if r.group_type == group_type))
            .collect())
    }

    /// Groups `person` belongs to, ascending.
    pub fn groups_for_person(&self, person: PersonId) -> StoreResult<&[GroupId]> {
        self.check_person(person)?;
        Ok(&self.memberships[person.index()])
    }

    pub fn is_group_member(&self, person: PersonId, group: GroupId) -> StoreResult<bool> {
        self.group_record(group)?;
        Ok(self.groups_for_person(person)?.binary_search(&group).is_ok())
    }

    pub fn group_count_for_person(&self, person: PersonId) -> StoreResult<usize> {
        Ok(self.groups_for_person(person)?.len())
    }

    pub fn group_type_count_for_person(
        &self,
        person:     PersonId,
        group_type: GroupTypeId,
    ) -> StoreResult<usize> {
        self.universe().group_type(group_type)?;
        Ok(self
            .groups_for_person(person)?
            .iter()
            .filter(|g| matches!(&self.groups[g.index()], Some(r) if r.group_type == group_type))
            .count())
    }

    pub fn group_type_counts(&self, person: PersonId) -> StoreResult<GroupTypeCounts> {
        let mut counts = vec![0; self.universe().group_type_count()];
        for group in self.groups_for_person(person)? {
            if let Some(record) = &self.groups[group.index()] {
                counts[record.group_type.index()] += 1;
            }
        }
        Ok(GroupTypeCounts(counts))
    }

    // ── Internal helpers ──────────────────────────────────────────────────

    fn group_record(&self, group: GroupId) -> StoreResult<&GroupRecord> {
        self.groups
            .get(group.index())
            .and_then(Option::as_ref)
            .ok_or(StoreError::UnknownGroupId(group))
    }

    fn group_record_mut(&mut self, group: GroupId) -> StoreResult<&mut GroupRecord> {
        self.groups
            .get_mut(group.index())
            .and_then(Option::as_mut)
            .ok_or(StoreError::UnknownGroupId(group))
    }
}
