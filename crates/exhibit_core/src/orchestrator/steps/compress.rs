//! Compress step - shrinks each materialized file in place.
//!
//! A file whose compression fails is carried forward uncompressed. Byte
//! totals only include files that were compressed successfully.

use crate::models::{CompressionInfo, StepName};
use crate::orchestrator::errors::StepResult;
use crate::orchestrator::step::AssemblyStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome, StepProgress};

pub struct CompressStep;

impl CompressStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CompressStep {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyStep for CompressStep {
    fn name(&self) -> StepName {
        StepName::Compress
    }

    fn execute(
        &self,
        ctx: &Context,
        run: &mut RunState,
        progress: &StepProgress,
    ) -> StepResult<StepOutcome> {
        let options = &ctx.options().compression;
        if !options.enabled {
            return Ok(StepOutcome::Skipped("compression disabled".to_string()));
        }
        if run.files.is_empty() {
            return Ok(StepOutcome::Skipped("no files to compress".to_string()));
        }

        ctx.logger
            .info(&format!("Compressing {} file(s), quality {}", run.files.len(), options.quality));
        let compressor = &ctx.collaborators.compressor;
        let total = run.files.len();

        for (index, file) in run.files.iter_mut().enumerate() {
            match compressor.compress(&file.path, options) {
                Ok(outcome) if outcome.success => {
                    progress.detail(&format!(
                        "{}: {} -> {} bytes ({:.1}%)",
                        file.name, outcome.original_size, outcome.compressed_size, outcome.reduction_percent
                    ));
                    run.original_size += outcome.original_size;
                    run.compressed_size += outcome.compressed_size;
                    if run.compression_method.is_none() {
                        run.compression_method = Some(outcome.method.clone());
                    }
                    file.compression = Some(CompressionInfo {
                        reduction: outcome.reduction_percent,
                        method: outcome.method,
                    });
                }
                Ok(_) => progress.warn(format!("{}: compressor reported no result, kept original", file.name))?,
                Err(e) => progress.warn(format!("{}: compression failed, kept original ({})", file.name, e))?,
            }
            progress.items(index + 1, total)?;
        }

        Ok(StepOutcome::Success)
    }
}
