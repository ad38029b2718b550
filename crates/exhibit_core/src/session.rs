//! One workflow session: the explicit context shared between a presenter
//! and the assembly pipeline.
//!
//! A session holds the settings and collaborators used for every run, the
//! background processor, the last request (so a failed run can be retried)
//! and the result once it has been transferred out of the processor.

use thiserror::Error;

use crate::collaborators::Collaborators;
use crate::config::Settings;
use crate::models::{AssemblyRequest, AssemblyResult, OverallStatus};
use crate::orchestrator::assembly_job;
use crate::processor::{BackgroundProcessor, ProcessorError};
use crate::state::ProcessingState;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("No previous request to retry")]
    NothingToRetry,

    #[error("Only a failed run can be retried (current status: {0})")]
    NotFailed(OverallStatus),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// What a presenter should render.
#[derive(Debug, Clone)]
pub enum SessionView {
    /// Nothing started yet.
    Idle,
    /// Still running; the snapshot carries per-step progress.
    Running(ProcessingState),
    /// Finished with a usable result, possibly without optional documents.
    Complete(AssemblyResult),
    /// Fatal error; offer a retry.
    Failed {
        message: String,
        state: ProcessingState,
    },
}

impl SessionView {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionView::Complete(_) | SessionView::Failed { .. })
    }
}

pub struct AssemblySession {
    settings: Settings,
    collaborators: Collaborators,
    processor: BackgroundProcessor,
    last_request: Option<AssemblyRequest>,
    result: Option<AssemblyResult>,
}

impl AssemblySession {
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        Self {
            settings,
            collaborators,
            processor: BackgroundProcessor::new(),
            last_request: None,
            result: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn processor(&self) -> &BackgroundProcessor {
        &self.processor
    }

    /// Result transferred from the last completed run.
    pub fn result(&self) -> Option<&AssemblyResult> {
        self.result.as_ref()
    }

    /// Discard the previous run and start assembling `request`.
    ///
    /// Refused while a run is in progress. Returns the new run id.
    pub fn generate(&mut self, request: AssemblyRequest) -> SessionResult<String> {
        self.processor.reset()?;
        self.result = None;
        self.last_request = Some(request.clone());

        let job = assembly_job(request, self.settings.clone(), self.collaborators.clone());
        let run_id = self.processor.start_processing(job)?;
        tracing::info!(run_id = %run_id, "Assembly started");
        Ok(run_id)
    }

    /// Restart the last request after a fatal error.
    pub fn retry(&mut self) -> SessionResult<String> {
        let status = self.processor.state().status();
        if status != OverallStatus::Error {
            return Err(SessionError::NotFailed(status));
        }
        let request = self
            .last_request
            .clone()
            .ok_or(SessionError::NothingToRetry)?;
        self.generate(request)
    }

    /// Read the processor once and update the session.
    ///
    /// The result is moved into the session the first time completion is
    /// observed.
    pub fn refresh(&mut self) -> SessionView {
        let state = self.processor.state();
        match state.status() {
            OverallStatus::Idle => SessionView::Idle,
            OverallStatus::Running => SessionView::Running(state),
            OverallStatus::Complete => {
                if let Some(result) = self.processor.take_result() {
                    self.result = Some(result);
                }
                match self.result.clone().or_else(|| state.result().cloned()) {
                    Some(result) => SessionView::Complete(result),
                    None => SessionView::Running(state),
                }
            }
            OverallStatus::Error => SessionView::Failed {
                message: state
                    .error_message()
                    .unwrap_or("Processing failed")
                    .to_string(),
                state,
            },
        }
    }

    /// Block until the current run ends, then refresh.
    pub fn wait(&mut self) -> SessionView {
        self.processor.wait();
        self.refresh()
    }
}
