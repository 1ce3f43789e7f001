//! `pk-core` — foundational types for the population simulation kernel.
//!
//! This crate is a dependency of every other `pk-*` crate.  It intentionally
//! has no `pk-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`ids`]       | `PersonId`, `GroupId`, `RegionId`, `CompartmentId`, …      |
//! | [`label`]     | `Label`, `Key`, the `key!` macro                           |
//! | [`value`]     | `PropertyValue`, `ValueKind`, `PropertyDefinition`         |
//! | [`time`]      | `Time`                                                     |
//! | [`rng`]       | `StreamRng`, `RngStreams`                                  |
//! | [`config`]    | `SimConfig`                                                |
//! | [`error`]     | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public data types.   |

pub mod config;
pub mod error;
pub mod ids;
pub mod label;
pub mod rng;
pub mod time;
pub mod value;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{DEFAULT_MAX_NOTIFICATION_DEPTH, SimConfig};
pub use error::{CoreError, CoreResult};
pub use ids::{
    CompartmentId, ComponentId, GroupId, GroupPropertyId, GroupTypeId, PersonId,
    PersonPropertyId, RegionId, ResourceId, RngId,
};
pub use label::{Key, Label};
pub use rng::{RngStreams, StreamRng};
pub use time::Time;
pub use value::{PropertyDefinition, PropertyValue, ValueKind};
