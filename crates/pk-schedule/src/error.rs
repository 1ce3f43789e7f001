use pk_core::{ComponentId, Key, Time};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("plan time {time} is before the current time {now}")]
    PastPlanningTime { time: Time, now: Time },

    #[error("plan time {0} is not a finite number")]
    InvalidPlanTime(Time),

    #[error("plan key must not be empty")]
    NullPlanKey,

    #[error("{component} already holds an active plan with key {key}")]
    DuplicatePlanKey { component: ComponentId, key: Key },
}

pub type PlanResult<T> = Result<T, PlanError>;
