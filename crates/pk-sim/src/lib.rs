//! `pk-sim` — components, change notification and the plan-driven run loop.
//!
//! # Mutation pipeline
//!
//! ```text
//! component callback
//!   └─ env.<mutator>(..)
//!        ① AttributeStore validates + applies   → Change(s)
//!        ② PartitionRegistry::apply per change  → MembershipDelta(s)
//!        ③ subscribed components, registration order:
//!             change event, then its partition deltas
//! ```
//!
//! # Crate layout
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`component`] | `Component<P>` trait, `ComponentKind`                    |
//! | [`env`]       | `Environment<P>` — the facade components act through     |
//! | [`event`]     | `EventCategory`, `Event`                                 |
//! | [`output`]    | `OutputHandler`, `NoopOutput`, `MemoryOutput`, `CsvOutput` |
//! | [`builder`]   | `SimBuilder<P>`                                          |
//! | [`sim`]       | `Sim<P>`, `RunSummary`                                   |
//! | [`error`]     | `SimError`, `OutputError`                                |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use pk_core::SimConfig;
//! use pk_sim::{ComponentKind, MemoryOutput, SimBuilder};
//! use pk_store::StoreBuilder;
//!
//! let store = StoreBuilder::new(universe).people(seeds).build()?;
//! let output = MemoryOutput::new();
//! let summary = SimBuilder::new(SimConfig::new(42), store)
//!     .component(ComponentKind::Global, Infection::default())
//!     .output(output.clone())
//!     .build()?
//!     .run()?;
//! ```

pub mod builder;
pub mod component;
pub mod env;
pub mod error;
pub mod event;
pub mod output;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use component::{Component, ComponentKind};
pub use env::Environment;
pub use error::{OutputError, OutputResult, SimError, SimResult};
pub use event::{Event, EventCategory};
pub use output::{CsvOutput, MemoryOutput, NoopOutput, OutputHandler, OutputItem};
pub use sim::{RunSummary, Sim};
