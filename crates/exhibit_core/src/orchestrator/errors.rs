//! Error types for the assembly pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Operation → Detail

use std::io;

use thiserror::Error;

use crate::collaborators::CollaboratorError;
use crate::models::StepName;
use crate::state::StateError;

/// Top-level pipeline error with run context.
///
/// Its `Display` output is the fatal message stored in the processing state.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Run '{run_id}' failed at step '{step}': {source}")]
    StepFailed {
        run_id: String,
        step: StepName,
        #[source]
        source: StepError,
    },

    /// Failed to set up the run (working directory, log file, etc.).
    #[error("Run '{run_id}' setup failed: {message}")]
    SetupFailed { run_id: String, message: String },

    /// The step state machine rejected a transition.
    #[error("Step state error: {0}")]
    State(#[from] StateError),

    /// The worker panicked.
    #[error("Processing aborted unexpectedly: {message}")]
    WorkerPanicked { message: String },
}

impl PipelineError {
    pub fn step_failed(run_id: impl Into<String>, step: StepName, source: StepError) -> Self {
        Self::StepFailed {
            run_id: run_id.into(),
            step,
            source,
        }
    }

    pub fn setup_failed(run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            run_id: run_id.into(),
            message: message.into(),
        }
    }

    pub fn worker_panicked(message: impl Into<String>) -> Self {
        Self::WorkerPanicked {
            message: message.into(),
        }
    }

    /// The step that failed, if this is a step failure.
    pub fn step(&self) -> Option<StepName> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// An external collaborator failed in a way the step cannot recover from.
    #[error("{operation} failed: {source}")]
    Collaborator {
        operation: String,
        #[source]
        source: CollaboratorError,
    },

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),

    /// Progress reporting was rejected by the step state machine.
    #[error("Step state error: {0}")]
    State(#[from] StateError),

    /// Generic step error with message.
    #[error("{0}")]
    Other(String),
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn collaborator(operation: impl Into<String>, source: CollaboratorError) -> Self {
        Self::Collaborator {
            operation: operation.into(),
            source,
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
