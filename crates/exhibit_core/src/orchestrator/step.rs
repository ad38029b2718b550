//! Assembly step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use crate::models::StepName;

use super::errors::StepResult;
use super::types::{Context, RunState, StepOutcome, StepProgress};

/// Trait for assembly steps.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// Soft per-item failures are reported through [`StepProgress::warn`].
/// Returning an error aborts the whole run.
pub trait AssemblyStep: Send + Sync {
    /// Identifier of the step in the processing state.
    fn name(&self) -> StepName;

    fn validate_input(&self, _ctx: &Context, _run: &RunState) -> StepResult<()> {
        Ok(())
    }

    /// Perform the step's work and record results in `run`.
    ///
    /// Returns `StepOutcome::Skipped` when the step has nothing to do
    /// (disabled option, empty working set).
    fn execute(
        &self,
        ctx: &Context,
        run: &mut RunState,
        progress: &StepProgress,
    ) -> StepResult<StepOutcome>;

    /// Called only after `execute` returns `Success`.
    fn validate_output(&self, _ctx: &Context, _run: &RunState) -> StepResult<()> {
        Ok(())
    }

    fn description(&self) -> &str {
        self.name().label()
    }
}
