//! `pk-store` — authoritative attribute storage for the population kernel.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`universe`] | `Universe`, `UniverseBuilder`, resource / group-type definitions |
//! | [`store`]    | `AttributeStore` (SoA person columns, region resources), `PersonSeed` |
//! | [`group`]    | group lifecycle, memberships, `GroupTypeCounts`            |
//! | [`change`]   | `Change` — the record every mutator returns                |
//! | [`builder`]  | `StoreBuilder`                                             |
//! | [`error`]    | `StoreError`, `StoreResult<T>`                             |
//!
//! # Mutation contract
//!
//! Every mutator either fails without touching state or applies the whole
//! mutation and returns the resulting [`Change`]s.  Resource balances are
//! `u64`: a withdrawal below zero fails with `InsufficientResourcesAvailable`
//! and a deposit past `u64::MAX` with `ResourceArithmetic`.

pub mod builder;
pub mod change;
pub mod error;
pub mod group;
pub mod store;
pub mod universe;


pub use builder::StoreBuilder;
pub use change::Change;
pub use error::{StoreError, StoreResult};
pub use group::GroupTypeCounts;
pub use store::{AttributeStore, PersonSeed};
pub use universe::{GroupTypeDefinition, ResourceDefinition, Universe, UniverseBuilder};
