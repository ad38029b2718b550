//! Aggregate state of one pipeline run.

use chrono::Local;
use serde::Serialize;

use super::errors::{StateError, StateResult};
use super::step::Step;
use crate::models::{AssemblyResult, OverallStatus, StepName, StepStatus};

/// Everything a poller can observe about a run.
///
/// Cloned as a whole under a lock, so a snapshot is always internally
/// consistent: `status == Complete` if and only if `result` is set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingState {
    run_id: Option<String>,
    /// Insertion order is execution order.
    steps: Vec<Step>,
    status: OverallStatus,
    started_at: Option<String>,
    finished_at: Option<String>,
    result: Option<AssemblyResult>,
    error_message: Option<String>,
}

impl ProcessingState {
    /// A fresh idle state with no steps.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn status(&self) -> OverallStatus {
        self.status
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, name: StepName) -> Option<&Step> {
        self.steps.iter().find(|s| s.name() == name)
    }

    pub fn result(&self) -> Option<&AssemblyResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn started_at(&self) -> Option<&str> {
        self.started_at.as_deref()
    }

    pub fn finished_at(&self) -> Option<&str> {
        self.finished_at.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        self.status == OverallStatus::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status == OverallStatus::Running
    }

    pub fn is_complete(&self) -> bool {
        self.status == OverallStatus::Complete
    }

    pub fn has_error(&self) -> bool {
        self.status == OverallStatus::Error
    }

    /// Mean progress over all registered steps.
    pub fn overall_progress(&self) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }
        let sum: u32 = self.steps.iter().map(|s| u32::from(s.progress())).sum();
        (sum / self.steps.len() as u32) as u8
    }

    /// Warnings from every step, in step order.
    pub fn warnings(&self) -> Vec<String> {
        self.steps
            .iter()
            .flat_map(|s| s.warnings().iter().cloned())
            .collect()
    }

    /// Start a run. Only valid from idle.
    pub(crate) fn begin(&mut self, run_id: impl Into<String>) -> StateResult<()> {
        match self.status {
            OverallStatus::Idle => {}
            OverallStatus::Running => return Err(StateError::AlreadyRunning),
            other => return Err(StateError::RunNotActive(other)),
        }
        *self = Self {
            run_id: Some(run_id.into()),
            status: OverallStatus::Running,
            started_at: Some(Local::now().to_rfc3339()),
            ..Self::default()
        };
        Ok(())
    }

    /// Set a step's status, creating the step if absent.
    pub fn update_step(
        &mut self,
        name: StepName,
        status: StepStatus,
        error_message: Option<String>,
    ) -> StateResult<()> {
        self.ensure_running()?;
        let step = match self.steps.iter().position(|s| s.name() == name) {
            Some(index) => &mut self.steps[index],
            None => {
                self.steps.push(Step::new(name));
                let last = self.steps.len() - 1;
                &mut self.steps[last]
            }
        };
        step.transition(status, error_message)
    }

    /// Update progress of a running step. Clamped to 0-100, never decreases.
    pub fn set_step_progress(&mut self, name: StepName, percent: f64) -> StateResult<()> {
        self.ensure_running()?;
        self.step_mut(name)?.advance(percent)
    }

    /// Mark a running step complete.
    pub fn complete_step(&mut self, name: StepName) -> StateResult<()> {
        self.ensure_running()?;
        let step = self.step_mut(name)?;
        if step.status() != StepStatus::Running {
            return Err(StateError::NotRunning {
                step: name,
                status: step.status(),
            });
        }
        step.transition(StepStatus::Complete, None)
    }

    /// Record a soft failure against a running step.
    pub fn record_step_warning(
        &mut self,
        name: StepName,
        message: impl Into<String>,
    ) -> StateResult<()> {
        self.ensure_running()?;
        self.step_mut(name)?.warn(message.into())
    }

    /// Attach the result and mark the run complete.
    ///
    /// Refused unless every registered step is complete; the run is then
    /// failed instead so the state never claims success with work missing.
    pub(crate) fn finish(&mut self, result: AssemblyResult) -> StateResult<()> {
        self.ensure_running()?;
        if let Some(step) = self
            .steps
            .iter()
            .find(|s| s.status() != StepStatus::Complete)
        {
            let err = StateError::Incomplete {
                step: step.name(),
                status: step.status(),
            };
            self.fail(err.to_string());
            return Err(err);
        }
        self.result = Some(result);
        self.error_message = None;
        self.status = OverallStatus::Complete;
        self.finished_at = Some(Local::now().to_rfc3339());
        Ok(())
    }

    /// Abort the run. Steps are left as they are for diagnostics.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.error_message = Some(if message.trim().is_empty() {
            "Processing failed".to_string()
        } else {
            message
        });
        self.result = None;
        self.status = OverallStatus::Error;
        self.finished_at = Some(Local::now().to_rfc3339());
    }

    fn ensure_running(&self) -> StateResult<()> {
        if self.status != OverallStatus::Running {
            return Err(StateError::RunNotActive(self.status));
        }
        Ok(())
    }

    fn step_mut(&mut self, name: StepName) -> StateResult<&mut Step> {
        self.steps
            .iter_mut()
            .find(|s| s.name() == name)
            .ok_or(StateError::UnknownStep(name))
    }
}
