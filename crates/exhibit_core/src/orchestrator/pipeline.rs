//! Pipeline runner that executes steps in sequence.

use crate::models::{StepName, StepStatus};
use crate::processor::ProgressHandle;

use super::errors::{PipelineError, PipelineResult, StepResult};
use super::step::AssemblyStep;
use super::types::{Context, RunState, StepOutcome, StepProgress};

/// Ordered sequence of assembly steps.
///
/// Each step is announced running, executed, and then either completed or
/// marked as failed before the next one begins. A failing step aborts the
/// run; earlier steps keep their final status for diagnostics.
pub struct Pipeline {
    steps: Vec<Box<dyn AssemblyStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step<S: AssemblyStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: AssemblyStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_names(&self) -> Vec<StepName> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step against `run`, reporting through `handle`.
    pub fn run(
        &self,
        ctx: &Context,
        run: &mut RunState,
        handle: &ProgressHandle,
    ) -> PipelineResult<()> {
        handle.register_steps(&self.step_names())?;

        for step in &self.steps {
            let name = step.name();
            ctx.logger.phase(name.as_str());
            handle.update_step(name, StepStatus::Running, None)?;

            let progress = StepProgress::new(handle.clone(), name, ctx.logger.clone());
            let outcome = run_step(step.as_ref(), ctx, run, &progress);
            run.warnings.extend(
                progress
                    .take_warnings()
                    .into_iter()
                    .map(|w| format!("{}: {}", name, w)),
            );

            match outcome {
                Ok(StepOutcome::Success) => {
                    ctx.logger.success(&format!("{} completed", name));
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    ctx.logger.info(&format!("{} skipped: {}", name, reason));
                }
                Err(e) => {
                    ctx.logger.error(&format!("{} failed: {}", name, e));
                    ctx.logger.show_tail(name.as_str());
                    handle.update_step(name, StepStatus::Error, Some(e.to_string()))?;
                    return Err(PipelineError::step_failed(&ctx.run_id, name, e));
                }
            }
            handle.complete_step(name)?;
        }

        ctx.logger.success("Pipeline completed successfully");
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn run_step(
    step: &dyn AssemblyStep,
    ctx: &Context,
    run: &mut RunState,
    progress: &StepProgress,
) -> StepResult<StepOutcome> {
    ctx.logger.debug(&format!("Validating input for '{}'", step.name()));
    step.validate_input(ctx, run)?;

    let outcome = step.execute(ctx, run, progress)?;
    if outcome == StepOutcome::Success {
        ctx.logger.debug(&format!("Validating output for '{}'", step.name()));
        step.validate_output(ctx, run)?;
    }
    Ok(outcome)
}
