//! `Label` and `Key` — the closed value types used for partition labels, plan
//! keys and partition keys.
//!
//! A `Label` is a small tagged union with structural equality, hashing and a
//! total order.  A `Key` is an ordered tuple of labels.  The empty tuple is the
//! *null key* and is refused wherever a key is required.

use std::fmt;

use crate::{CompartmentId, GroupTypeId, RegionId};

// ── Label ─────────────────────────────────────────────────────────────────────

/// One component of a partition label or compound key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Label {
    Int(i64),
    Str(String),
    Bool(bool),
    /// An enumeration member or an id from the scenario universe.
    Tag(u32),
}

impl From<i64> for Label {
    fn from(v: i64) -> Label {
        Label::Int(v)
    }
}

impl From<i32> for Label {
    fn from(v: i32) -> Label {
        Label::Int(v as i64)
    }
}

impl From<u64> for Label {
    /// Saturates at `i64::MAX`; resource balances never get that close in
    /// practice and labels only need to discriminate, not round-trip.
    fn from(v: u64) -> Label {
        Label::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Label {
    fn from(v: bool) -> Label {
        Label::Bool(v)
    }
}

impl From<&str> for Label {
    fn from(v: &str) -> Label {
        Label::Str(v.to_owned())
    }
}

impl From<String> for Label {
    fn from(v: String) -> Label {
        Label::Str(v)
    }
}

impl From<CompartmentId> for Label {
    fn from(id: CompartmentId) -> Label {
        Label::Tag(id.0 as u32)
    }
}

impl From<RegionId> for Label {
    fn from(id: RegionId) -> Label {
        Label::Tag(id.0 as u32)
    }
}

impl From<GroupTypeId> for Label {
    fn from(id: GroupTypeId) -> Label {
        Label::Tag(id.0 as u32)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{v}"),
            Label::Str(s) => write!(f, "{s:?}"),
            Label::Bool(b) => write!(f, "{b}"),
            Label::Tag(t) => write!(f, "#{t}"),
        }
    }
}

// ── Key ───────────────────────────────────────────────────────────────────────

/// An ordered tuple of labels with structural equality and hashing.
///
/// Used for plan keys (scoped to the owning component) and partition keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Key(Vec<Label>);

impl Key {
    pub fn new(labels: Vec<Label>) -> Self {
        Key(labels)
    }

    /// A one-element key.
    pub fn single(label: impl Into<Label>) -> Self {
        Key(vec![label.into()])
    }

    /// The empty tuple, refused wherever a key is required.
    pub fn null() -> Self {
        Key(Vec::new())
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> &[Label] {
        &self.0
    }
}

impl FromIterator<Label> for Key {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Key(iter.into_iter().collect())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Key {
        Key::single(s)
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Key {
        Key::single(v)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}")?;
        }
        write!(f, ")")
    }
}

/// Build a [`Key`] from a comma-separated list of label-convertible values.
///
/// ```rust
/// use pk_core::{key, Label};
///
/// let k = key!["vaccinate", 3i64];
/// assert_eq!(k.labels(), &[Label::from("vaccinate"), Label::Int(3)]);
/// ```
#[macro_export]
macro_rules! key {
    ($($label:expr),* $(,)?) => {
        $crate::Key::new(vec![$($crate::Label::from($label)),*])
    };
}
