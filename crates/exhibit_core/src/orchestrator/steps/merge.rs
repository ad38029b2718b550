//! Merge step - produces the single package file.
//!
//! With merging enabled the table of contents (if any) and every numbered
//! exhibit are concatenated in order. Otherwise the first numbered exhibit
//! serves as the package. Without numbered exhibits there is no package,
//! which is a valid empty outcome.

use crate::models::StepName;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::AssemblyStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome, StepProgress};

pub const PACKAGE_FILE: &str = "exhibit_package.pdf";

/// Builds the package. Without merging the package is the first numbered
/// exhibit, never the table of contents.
pub struct MergeStep;

impl MergeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MergeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyStep for MergeStep {
    fn name(&self) -> StepName {
        StepName::Merge
    }

    fn validate_input(&self, _ctx: &Context, run: &RunState) -> StepResult<()> {
        if run.numbered_files.len() != run.exhibits.len() {
            return Err(StepError::precondition_failed(format!(
                "{} numbered file(s) for {} exhibit(s)",
                run.numbered_files.len(),
                run.exhibits.len()
            )));
        }
        if let Some(missing) = run
            .toc_path
            .iter()
            .chain(run.numbered_files.iter())
            .find(|p| !p.is_file())
        {
            return Err(StepError::invalid_input(format!(
                "missing document: {}",
                missing.display()
            )));
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &Context,
        run: &mut RunState,
        progress: &StepProgress,
    ) -> StepResult<StepOutcome> {
        if run.numbered_files.is_empty() {
            return Ok(StepOutcome::Skipped("no numbered exhibits".to_string()));
        }

        if !ctx.options().merge_into_single_file {
            run.package_path = run.numbered_files.first().cloned();
            ctx.logger
                .info("Merging disabled, first exhibit is the package");
            return Ok(StepOutcome::Success);
        }

        let inputs: Vec<_> = run
            .toc_path
            .iter()
            .chain(run.numbered_files.iter())
            .cloned()
            .collect();
        ctx.logger
            .info(&format!("Merging {} document(s)", inputs.len()));

        let merged = ctx
            .collaborators
            .pdf
            .merge(&inputs, &ctx.work_path(PACKAGE_FILE))
            .map_err(|e| StepError::collaborator("Merging package", e))?;
        run.package_path = Some(merged);
        progress.set(100.0)?;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, run: &RunState) -> StepResult<()> {
        match &run.package_path {
            Some(path) if path.is_file() => Ok(()),
            Some(path) => Err(StepError::invalid_output(format!(
                "package not written: {}",
                path.display()
            ))),
            None => Err(StepError::invalid_output("package not recorded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use crate::collaborators::fakes::{self, FakePdf};
    use crate::models::{AssemblyOptions, AssemblyRequest, Exhibit};
    use crate::orchestrator::testing::Fixture;

    #[test]
    fn merges_toc_first_then_exhibits() {
        let pdf = Arc::new(FakePdf::default());
        let fixture = Fixture::new(
            AssemblyRequest::default(),
            fakes::collaborators().with_pdf(pdf.clone()),
        );
        let mut run = RunState::new("run");
        let toc = fixture.materialize("toc.pdf", b"pages:1\n").path;
        let a = fixture.materialize("A.pdf", b"pages:3\n").path;
        let b = fixture.materialize("B.pdf", b"pages:2\n").path;
        run.toc_path = Some(toc.clone());
        run.numbered_files = vec![a.clone(), b.clone()];
        let progress = fixture.progress(StepName::Merge);

        let step = MergeStep::new();
        step.execute(&fixture.ctx, &mut run, &progress).unwrap();
        step.validate_output(&fixture.ctx, &run).unwrap();

        assert_eq!(*pdf.merged_inputs.lock(), vec![toc, a, b]);
        let merged = fs::read_to_string(run.package_path.unwrap()).unwrap();
        assert!(merged.starts_with("pages:6"));
    }

    #[test]
    fn without_merge_first_exhibit_is_the_package() {
        let options = AssemblyOptions {
            merge_into_single_file: false,
            ..Default::default()
        };
        let fixture = Fixture::new(AssemblyRequest::new(options), fakes::collaborators());
        let mut run = RunState::new("run");
        let a = fixture.materialize("A.pdf", b"pages:1\n").path;
        let b = fixture.materialize("B.pdf", b"pages:1\n").path;
        run.toc_path = Some(fixture.materialize("toc.pdf", b"pages:1\n").path);
        run.numbered_files = vec![a.clone(), b];
        let progress = fixture.progress(StepName::Merge);

        MergeStep::new()
            .execute(&fixture.ctx, &mut run, &progress)
            .unwrap();
        assert_eq!(run.package_path, Some(a));
    }

    #[test]
    fn nothing_to_merge_leaves_package_unset() {
        let fixture = Fixture::new(AssemblyRequest::default(), fakes::collaborators());
        let mut run = RunState::new("run");
        let progress = fixture.progress(StepName::Merge);

        let outcome = MergeStep::new()
            .execute(&fixture.ctx, &mut run, &progress)
            .unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        assert!(run.package_path.is_none());
    }

    fn exhibit(number: &str) -> Exhibit {
        Exhibit {
            number: number.into(),
            title: number.into(),
            filename: format!("{}.pdf", number),
            pages: 1,
            compression: None,
            analysis: None,
        }
    }

    #[test]
    fn numbered_files_must_match_exhibits() {
        let fixture = Fixture::new(AssemblyRequest::default(), fakes::collaborators());
        let mut run = RunState::new("run");
        run.exhibits = vec![exhibit("A"), exhibit("B")];
        run.numbered_files = vec![fixture.materialize("A.pdf", b"pages:1\n").path];

        let err = MergeStep::new()
            .validate_input(&fixture.ctx, &run)
            .unwrap_err();
        assert!(matches!(err, StepError::PreconditionFailed(_)));
    }

    #[test]
    fn missing_numbered_file_is_rejected() {
        let fixture = Fixture::new(AssemblyRequest::default(), fakes::collaborators());
        let mut run = RunState::new("run");
        run.exhibits = vec![exhibit("A")];
        run.numbered_files = vec![fixture.ctx.work_path("gone.pdf")];

        let err = MergeStep::new()
            .validate_input(&fixture.ctx, &run)
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidInput(_)));
        assert!(err.to_string().contains("gone.pdf"));
    }

    #[test]
    fn consistent_run_passes_validation() {
        let fixture = Fixture::new(AssemblyRequest::default(), fakes::collaborators());
        let mut run = RunState::new("run");
        run.exhibits = vec![exhibit("A")];
        run.numbered_files = vec![fixture.materialize("A.pdf", b"pages:1\n").path];

        MergeStep::new().validate_input(&fixture.ctx, &run).unwrap();
    }
}
