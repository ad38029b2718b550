//! A single trackable step and its transition rules.

use serde::Serialize;

use super::errors::{StateError, StateResult};
use crate::models::{StepName, StepStatus};

/// One named unit of pipeline work.
///
/// Fields are only changed through [`ProcessingState`](super::ProcessingState),
/// which enforces the transition rules below.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    name: StepName,
    status: StepStatus,
    progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

impl Step {
    pub(crate) fn new(name: StepName) -> Self {
        Self {
            name,
            status: StepStatus::Pending,
            progress: 0,
            error_message: None,
            warnings: Vec::new(),
        }
    }

    pub fn name(&self) -> StepName {
        self.name
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Percent complete, 0-100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Present only when the step ended in error.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Soft per-item failures recorded while the step ran.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Move to `to`.
    ///
    /// Pending -> Running -> {Complete, Error}, plus Pending -> Error for
    /// steps that fail before they start. Re-applying the current status is
    /// a no-op. Terminal steps never move again.
    pub(crate) fn transition(&mut self, to: StepStatus, error: Option<String>) -> StateResult<()> {
        use StepStatus::*;

        if self.status == to {
            return Ok(());
        }

        match (self.status, to) {
            (Pending, Running) => {}
            (Running, Complete) => self.progress = 100,
            (Pending, Error) | (Running, Error) => {
                self.error_message =
                    Some(error.unwrap_or_else(|| format!("{} failed", self.name)));
            }
            (from, to) => {
                return Err(StateError::InvalidTransition {
                    step: self.name,
                    from,
                    to,
                })
            }
        }

        self.status = to;
        Ok(())
    }

    /// Raise progress; lower values are ignored so readers never see it drop.
    pub(crate) fn advance(&mut self, percent: f64) -> StateResult<()> {
        if self.status != StepStatus::Running {
            return Err(StateError::NotRunning {
                step: self.name,
                status: self.status,
            });
        }

        let clamped = if percent.is_nan() {
            0
        } else {
            percent.clamp(0.0, 100.0).round() as u8
        };
        self.progress = self.progress.max(clamped);
        Ok(())
    }

    pub(crate) fn warn(&mut self, message: String) -> StateResult<()> {
        if self.status != StepStatus::Running {
            return Err(StateError::NotRunning {
                step: self.name,
                status: self.status,
            });
        }
        self.warnings.push(message);
        Ok(())
    }
}
