use pk_core::{ComponentId, CoreError};
use pk_partition::PartitionError;
use pk_schedule::PlanError;
use pk_store::StoreError;
use thiserror::Error;

use crate::ComponentKind;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("{component} ({kind}) may not {action}")]
    ComponentLacksPermission {
        component: ComponentId,
        kind:      ComponentKind,
        action:    &'static str,
    },

    #[error("component does not implement `{0}`")]
    Unimplemented(&'static str),

    #[error("observer notifications nested deeper than {limit}")]
    NotificationDepthExceeded { limit: usize },

    #[error("no component is executing")]
    NoFocalComponent,

    #[error("unknown component {0}")]
    UnknownComponentId(ComponentId),

    /// Raised by application components for their own failures.
    #[error("component failure: {0}")]
    Component(String),
}

pub type SimResult<T> = Result<T, SimError>;
