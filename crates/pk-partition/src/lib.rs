//! `pk-partition` — labelled, incrementally maintained population partitions.
//!
//! A partition is a [`Filter`] selecting people plus optional labeling
//! functions that split the selected people into buckets.  The registry keeps
//! every attached partition exactly consistent with the store: after each
//! store mutation the caller hands the resulting [`Change`](pk_store::Change)
//! to [`PartitionRegistry::apply`], which re-evaluates the affected person in
//! the partitions sensitive to the touched [`Dimension`] only.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`filter`]    | `Filter`, `Equality`                                    |
//! | [`partition`] | `Partition` (filter + labelers), `Labeler<T>`           |
//! | [`label_set`] | `LabelSet` — bucket identity and query                  |
//! | [`dimension`] | `Dimension` — the relevance-index key                   |
//! | [`registry`]  | `PartitionRegistry`, `MembershipDelta`                  |
//! | [`sampler`]   | `Sampler` — weighted / uniform draw options             |
//! | [`error`]     | `PartitionError`, `PartitionResult<T>`                  |
//!
//! # Cost model
//!
//! | Operation             | Cost                                         |
//! |-----------------------|----------------------------------------------|
//! | attach                | O(population) filter + label evaluations     |
//! | maintenance per change| O(relevant partitions), one evaluation each  |
//! | membership test       | O(1)                                         |
//! | people / size by query| O(buckets + result)                          |
//! | sample                | O(buckets)                                   |

pub mod dimension;
pub mod error;
pub mod filter;
mod index;
pub mod label_set;
pub mod partition;
pub mod registry;
pub mod sampler;


pub use dimension::Dimension;
pub use error::{PartitionError, PartitionResult};
pub use filter::{Equality, Filter};
pub use label_set::LabelSet;
pub use partition::{Labeler, Partition};
pub use registry::{MembershipDelta, PartitionRegistry};
pub use sampler::Sampler;
