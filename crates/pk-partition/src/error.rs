use pk_core::{CoreError, Key, PersonPropertyId};
use pk_store::StoreError;
use thiserror::Error;

use crate::{Dimension, Equality};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PartitionError {
    #[error("the null key cannot name a partition")]
    NullPartitionKey,

    #[error("a partition is already indexed under key {0}")]
    DuplicateIndexedPopulation(Key),

    #[error("no partition is indexed under key {0}")]
    UnknownPopulationPartitionKey(Key),

    #[error("partition {key} has no labeler for {dimension}")]
    IncompatiblePopulationPartitionQuery { key: Key, dimension: Dimension },

    #[error("comparison value for person property {property} has no order; `{equality}` is not applicable")]
    NonComparableProperty {
        property: PersonPropertyId,
        equality: Equality,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type PartitionResult<T> = Result<T, PartitionError>;
