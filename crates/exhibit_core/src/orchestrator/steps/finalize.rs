//! Finalize step - copies artifacts to durable storage and builds the result.
//!
//! The package lands in `<output_folder>/<run_id>/` with a timestamped name;
//! ancillary documents are copied next to it. Nothing in the result points
//! into the working directory, which is discarded after the run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::models::{average_reduction, AssemblyResult, StepName};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::AssemblyStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome, StepProgress};

pub struct FinalizeStep;

impl FinalizeStep {
    pub fn new() -> Self {
        Self
    }

    fn ensure_output_dir(&self, ctx: &Context) -> StepResult<()> {
        fs::create_dir_all(&ctx.output_dir).map_err(|e| {
            StepError::io_error(format!("creating {}", ctx.output_dir.display()), e)
        })
    }

    /// Copy an ancillary document; failure only drops it from the result.
    fn copy_ancillary(
        &self,
        ctx: &Context,
        source: Option<&PathBuf>,
        progress: &StepProgress,
    ) -> StepResult<Option<PathBuf>> {
        let Some(source) = source else {
            return Ok(None);
        };
        let name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "document".into());
        let destination = ctx.output_dir.join(name);
        match copy(source, &destination) {
            Ok(()) => Ok(Some(destination)),
            Err(e) => {
                progress.warn(format!("{}: could not be saved ({})", source.display(), e))?;
                Ok(None)
            }
        }
    }
}

impl Default for FinalizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyStep for FinalizeStep {
    fn name(&self) -> StepName {
        StepName::Finalize
    }

    fn execute(
        &self,
        ctx: &Context,
        run: &mut RunState,
        progress: &StepProgress,
    ) -> StepResult<StepOutcome> {
        let cover_source = run.cover_letter.as_produced();
        let filing_source = run.filing_instructions.as_produced();
        if run.package_path.is_some() || cover_source.is_some() || filing_source.is_some() {
            self.ensure_output_dir(ctx)?;
        }

        let output_file = match &run.package_path {
            Some(package) => {
                let name = format!(
                    "exhibit_package_{}.pdf",
                    Local::now().format("%Y%m%d_%H%M%S")
                );
                let destination = ctx.output_dir.join(name);
                copy(package, &destination).map_err(|e| {
                    StepError::io_error(format!("saving package to {}", destination.display()), e)
                })?;
                Some(destination)
            }
            None => None,
        };
        progress.set(50.0)?;

        let cover_letter_path = self.copy_ancillary(ctx, cover_source, progress)?;
        let filing_instructions_path = self.copy_ancillary(ctx, filing_source, progress)?;

        let total_pages = run.exhibits.iter().map(|e| e.pages).sum();
        let result = AssemblyResult {
            output_file,
            exhibit_list: run.exhibits.clone(),
            total_pages,
            original_size: run.original_size,
            compressed_size: run.compressed_size,
            average_reduction: average_reduction(run.original_size, run.compressed_size),
            compression_method: run.compression_method.clone(),
            cover_letter_path,
            filing_instructions_path,
            warnings: Vec::new(),
        };

        ctx.logger.info(&format!(
            "{} exhibit(s), {} page(s), package {}",
            result.exhibit_count(),
            result.total_pages,
            result
                .output_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "not produced".to_string())
        ));
        run.result = Some(result);
        progress.set(100.0)?;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, run: &RunState) -> StepResult<()> {
        let result = run
            .result
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("result not recorded"))?;
        if let Some(path) = result.output_file.as_ref().filter(|p| !p.is_file()) {
            return Err(StepError::invalid_output(format!(
                "package missing after copy: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

fn copy(source: &Path, destination: &Path) -> std::io::Result<()> {
    fs::copy(source, destination).map(|_| ())
}
