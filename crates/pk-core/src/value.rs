//! Property values and property definitions.
//!
//! Property values are a closed sum type.  A [`PropertyDefinition`] carries
//! its [`ValueKind`] explicitly (derived from the default value, so a
//! definition can never disagree with its own default) and every write is
//! checked against it.

use std::cmp::Ordering;
use std::fmt;

use crate::{CoreError, CoreResult};

// ── ValueKind ─────────────────────────────────────────────────────────────────

/// The type of a property.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Bool,
    Int,
    Long,
    Double,
    Str,
    Enum,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::Str => "string",
            ValueKind::Enum => "enum",
        };
        f.write_str(s)
    }
}

// ── PropertyValue ─────────────────────────────────────────────────────────────

/// The value of a person or group property.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
    /// Member of an application-defined enumeration.
    Enum(u32),
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Long(_) => ValueKind::Long,
            PropertyValue::Double(_) => ValueKind::Double,
            PropertyValue::Str(_) => ValueKind::Str,
            PropertyValue::Enum(_) => ValueKind::Enum,
        }
    }

    /// Order two values of the same kind.  Booleans order `false < true`;
    /// enumeration tags order by ordinal.
    ///
    /// Returns `None` across kinds and when either double is NaN.
    pub fn compare(&self, other: &PropertyValue) -> Option<Ordering> {
        match (self, other) {
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => Some(a.cmp(b)),
            (PropertyValue::Enum(a), PropertyValue::Enum(b)) => Some(a.cmp(b)),
            (PropertyValue::Int(a), PropertyValue::Int(b)) => Some(a.cmp(b)),
            (PropertyValue::Long(a), PropertyValue::Long(b)) => Some(a.cmp(b)),
            (PropertyValue::Double(a), PropertyValue::Double(b)) => a.partial_cmp(b),
            (PropertyValue::Str(a), PropertyValue::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// `true` unless this is a NaN double, which has no place in any order.
    pub fn is_comparable(&self) -> bool {
        !matches!(self, PropertyValue::Double(d) if d.is_nan())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v as i64),
            PropertyValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Long(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Str(v)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Long(v) => write!(f, "{v}L"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::Str(v) => write!(f, "{v:?}"),
            PropertyValue::Enum(v) => write!(f, "enum#{v}"),
        }
    }
}

// ── PropertyDefinition ────────────────────────────────────────────────────────

/// Declaration of a person or group property.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyDefinition {
    kind:         ValueKind,
    default:      PropertyValue,
    mutable:      bool,
    time_tracked: bool,
}

impl PropertyDefinition {
    /// A mutable, untracked property whose kind is that of `default`.
    pub fn new(default: impl Into<PropertyValue>) -> Self {
        let default = default.into();
        Self {
            kind: default.kind(),
            default,
            mutable: true,
            time_tracked: false,
        }
    }

    /// Refuse writes after the initial value is assigned.
    pub fn immutable(mut self) -> Self {
        self.mutable = false;
        self
    }

    /// Record the simulation time of every assignment.
    pub fn time_tracked(mut self) -> Self {
        self.time_tracked = true;
        self
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    #[inline]
    pub fn default_value(&self) -> &PropertyValue {
        &self.default
    }

    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    #[inline]
    pub fn is_time_tracked(&self) -> bool {
        self.time_tracked
    }

    /// Fail with [`CoreError::IncompatibleValue`] unless `value` has this
    /// definition's kind.
    pub fn check(&self, value: &PropertyValue) -> CoreResult<()> {
        if value.kind() == self.kind {
            Ok(())
        } else {
            Err(CoreError::IncompatibleValue {
                expected: self.kind,
                got:      value.kind(),
            })
        }
    }
}
