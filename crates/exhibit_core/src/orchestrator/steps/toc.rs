//! Table of contents step.

use crate::models::StepName;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::AssemblyStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome, StepProgress};

pub const TOC_FILE: &str = "Table_of_Contents.pdf";

/// Builds the table of contents that leads the merged package.
pub struct TocStep;

impl TocStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TocStep {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyStep for TocStep {
    fn name(&self) -> StepName {
        StepName::Toc
    }

    fn execute(
        &self,
        ctx: &Context,
        run: &mut RunState,
        progress: &StepProgress,
    ) -> StepResult<StepOutcome> {
        if !ctx.options().generate_toc {
            return Ok(StepOutcome::Skipped("table of contents disabled".to_string()));
        }
        if !run.has_exhibits() {
            return Ok(StepOutcome::Skipped("no exhibits".to_string()));
        }

        let destination = ctx.work_path(TOC_FILE);
        let path = ctx
            .collaborators
            .pdf
            .generate_table_of_contents(&run.exhibits, ctx.visa_type(), &destination)
            .map_err(|e| StepError::collaborator("Generating table of contents", e))?;

        ctx.logger.info(&format!(
            "Table of contents lists {} exhibit(s)",
            run.exhibits.len()
        ));
        run.toc_path = Some(path);
        progress.set(100.0)?;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, run: &RunState) -> StepResult<()> {
        match &run.toc_path {
            Some(path) if path.is_file() => Ok(()),
            Some(path) => Err(StepError::invalid_output(format!(
                "table of contents not written: {}",
                path.display()
            ))),
            None => Err(StepError::invalid_output("table of contents not recorded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::collaborators::fakes::{self, FakePdf};
    use crate::models::{AssemblyRequest, Exhibit};
    use crate::orchestrator::testing::Fixture;

    fn exhibit(number: &str) -> Exhibit {
        Exhibit {
            number: number.into(),
            title: format!("Doc {}", number),
            filename: format!("{}.pdf", number),
            pages: 1,
            compression: None,
            analysis: None,
        }
    }

    #[test]
    fn writes_toc_for_exhibits() {
        let fixture = Fixture::new(AssemblyRequest::default(), fakes::collaborators());
        let mut run = RunState::new("run");
        run.exhibits = vec![exhibit("A"), exhibit("B")];
        let progress = fixture.progress(StepName::Toc);

        let step = TocStep::new();
        assert_eq!(
            step.execute(&fixture.ctx, &mut run, &progress).unwrap(),
            StepOutcome::Success
        );
        step.validate_output(&fixture.ctx, &run).unwrap();
        assert!(run.toc_path.unwrap().ends_with(TOC_FILE));
    }

    #[test]
    fn skipped_without_exhibits() {
        let fixture = Fixture::new(AssemblyRequest::default(), fakes::collaborators());
        let mut run = RunState::new("run");
        let progress = fixture.progress(StepName::Toc);

        let outcome = TocStep::new()
            .execute(&fixture.ctx, &mut run, &progress)
            .unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        assert!(run.toc_path.is_none());
    }

    #[test]
    fn renderer_failure_is_fatal() {
        let pdf = FakePdf {
            fail_toc: true,
            ..Default::default()
        };
        let fixture = Fixture::new(
            AssemblyRequest::default(),
            fakes::collaborators().with_pdf(Arc::new(pdf)),
        );
        let mut run = RunState::new("run");
        run.exhibits = vec![exhibit("A")];
        let progress = fixture.progress(StepName::Toc);

        let err = TocStep::new()
            .execute(&fixture.ctx, &mut run, &progress)
            .unwrap_err();
        assert!(err.to_string().contains("table of contents"));
    }
}
