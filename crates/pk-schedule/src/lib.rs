//! `pk-schedule` — the plan queue that drives simulated time.
//!
//! # Crate layout
//!
//! | Module         | Contents                                              |
//! |----------------|-------------------------------------------------------|
//! | [`plan_queue`] | `PlanQueue` (`BTreeMap<(Time, seq), plan>`), `PlanHandle`, `DuePlan` |
//! | [`error`]      | `PlanError`, `PlanResult<T>`                          |
//!
//! # Dispatch model (summary)
//!
//! ```text
//! while let Some(plan) = queue.pop_next():
//!     now = plan.time                  // never decreases
//!     owner(plan).execute_plan(plan)   // may push more plans, even at `now`
//! ```
//!
//! Plans due at the same time dispatch in submission order.

pub mod error;
pub mod plan_queue;


pub use error::{PlanError, PlanResult};
pub use plan_queue::{DuePlan, PlanHandle, PlanQueue};
