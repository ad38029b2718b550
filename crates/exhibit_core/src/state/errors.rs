//! Errors raised by the step state machine.

use thiserror::Error;

use crate::models::{OverallStatus, StepName, StepStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Step '{step}' cannot move from {from} to {to}")]
    InvalidTransition {
        step: StepName,
        from: StepStatus,
        to: StepStatus,
    },

    #[error("Step '{step}' is {status}, not running")]
    NotRunning { step: StepName, status: StepStatus },

    #[error("Step '{0}' has not been registered")]
    UnknownStep(StepName),

    #[error("Run is {0}, expected running")]
    RunNotActive(OverallStatus),

    #[error("A run is already in progress")]
    AlreadyRunning,

    #[error("Run cannot complete: step '{step}' is {status}")]
    Incomplete { step: StepName, status: StepStatus },
}

pub type StateResult<T> = Result<T, StateError>;
