//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  The inner integer is `pub` to allow
//! direct indexing into SoA `Vec`s via `id.0 as usize`, but callers should
//! prefer the `.index()` helpers for clarity.
//!
//! People and groups are allocated at run time; every other id names an
//! element of the scenario universe and is dense from zero.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Handle of a person.  Stable for the person's lifetime and never reused.
    pub struct PersonId(u32);
}

typed_id! {
    /// Handle of a group.  Stable for the group's lifetime and never reused.
    pub struct GroupId(u32);
}

typed_id! {
    /// Compartment (disease-state bucket) in the scenario universe.
    pub struct CompartmentId(u16);
}

typed_id! {
    /// Region (geographic bucket) in the scenario universe.
    pub struct RegionId(u16);
}

typed_id! {
    /// Resource type held by people and regions.
    pub struct ResourceId(u16);
}

typed_id! {
    /// Person property declared in the scenario universe.
    pub struct PersonPropertyId(u16);
}

typed_id! {
    /// Group property declared in the scenario universe.
    pub struct GroupPropertyId(u16);
}

typed_id! {
    /// Group type.  A group's type is fixed when the group is created.
    pub struct GroupTypeId(u16);
}

typed_id! {
    /// Registration slot of a component.  Registration order is observer order.
    pub struct ComponentId(u16);
}

typed_id! {
    /// A named deterministic random stream declared in `SimConfig`.
    pub struct RngId(u16);
}
