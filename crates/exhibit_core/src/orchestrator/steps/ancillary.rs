//! Cover letter and filing instructions steps.
//!
//! Both documents are optional. A renderer failure is recorded as a
//! warning and leaves the document unset; it never aborts the run.

use crate::models::{FeatureOutcome, StepName};
use crate::orchestrator::errors::StepResult;
use crate::orchestrator::step::AssemblyStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome, StepProgress};

pub const COVER_LETTER_FILE: &str = "Cover_Letter.md";
pub const FILING_INSTRUCTIONS_FILE: &str = "Filing_Instructions.md";

pub struct CoverLetterStep;

impl CoverLetterStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CoverLetterStep {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyStep for CoverLetterStep {
    fn name(&self) -> StepName {
        StepName::Cover
    }

    fn execute(
        &self,
        ctx: &Context,
        run: &mut RunState,
        progress: &StepProgress,
    ) -> StepResult<StepOutcome> {
        if !ctx.options().generate_cover_letter {
            return Ok(StepOutcome::Skipped("cover letter disabled".to_string()));
        }

        let outcome = FeatureOutcome::from_result(ctx.collaborators.renderer.generate_cover_letter(
            &ctx.request.case,
            ctx.visa_type(),
            &run.exhibits,
            &ctx.work_path(COVER_LETTER_FILE),
        ));
        report(progress, "cover letter", &outcome)?;
        run.cover_letter = outcome;
        progress.set(100.0)?;
        Ok(StepOutcome::Success)
    }
}

pub struct FilingInstructionsStep;

impl FilingInstructionsStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FilingInstructionsStep {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyStep for FilingInstructionsStep {
    fn name(&self) -> StepName {
        StepName::FilingInstructions
    }

    fn execute(
        &self,
        ctx: &Context,
        run: &mut RunState,
        progress: &StepProgress,
    ) -> StepResult<StepOutcome> {
        if !ctx.options().generate_filing_instructions {
            return Ok(StepOutcome::Skipped("filing instructions disabled".to_string()));
        }

        let outcome = FeatureOutcome::from_result(
            ctx.collaborators.renderer.generate_filing_instructions(
                &ctx.request.case,
                ctx.visa_type(),
                &run.exhibits,
                &ctx.work_path(FILING_INSTRUCTIONS_FILE),
            ),
        );
        report(progress, "filing instructions", &outcome)?;
        run.filing_instructions = outcome;
        progress.set(100.0)?;
        Ok(StepOutcome::Success)
    }
}

fn report<T>(progress: &StepProgress, what: &str, outcome: &FeatureOutcome<T>) -> StepResult<()> {
    match outcome {
        FeatureOutcome::Produced(_) => progress.detail(&format!("{} generated", what)),
        FeatureOutcome::NotProduced => progress.detail(&format!("no {} produced", what)),
        FeatureOutcome::Failed(reason) => {
            progress.warn(format!("{} generation failed ({})", what, reason))?
        }
    }
    Ok(())
}
