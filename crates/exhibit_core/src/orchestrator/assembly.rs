//! Exhibit assembly job: sets up a run and drives the standard pipeline.

use std::sync::Arc;

use crate::collaborators::Collaborators;
use crate::config::Settings;
use crate::logging::{LogConfig, RunLoggerBuilder};
use crate::models::{AssemblyRequest, AssemblyResult, StepName};
use crate::processor::ProgressHandle;

use super::errors::{PipelineError, PipelineResult, StepError};
use super::pipeline::Pipeline;
use super::steps::{
    CompressStep, CoverLetterStep, ExtractStep, FilingInstructionsStep, FinalizeStep, MergeStep,
    NumberStep, TocStep,
};
use super::types::{Context, RunState};
use super::workspace::WorkDir;

/// Create a pipeline with every assembly step in order.
///
/// 1. Extract - materialize inputs into the working directory
/// 2. Compress - shrink each file (optional)
/// 3. Number - label, analyze and add numbered cover pages
/// 4. Toc - table of contents (optional)
/// 5. Cover - cover letter (optional)
/// 6. FilingInstructions - filing instructions (optional)
/// 7. Merge - build the package file
/// 8. Finalize - copy artifacts to durable storage, build the result
pub fn standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(ExtractStep::new())
        .with_step(CompressStep::new())
        .with_step(NumberStep::new())
        .with_step(TocStep::new())
        .with_step(CoverLetterStep::new())
        .with_step(FilingInstructionsStep::new())
        .with_step(MergeStep::new())
        .with_step(FinalizeStep::new())
}

/// The job to hand to `BackgroundProcessor::start_processing`.
pub fn assembly_job(
    request: AssemblyRequest,
    settings: Settings,
    collaborators: Collaborators,
) -> impl FnOnce(&ProgressHandle) -> PipelineResult<AssemblyResult> + Send + 'static {
    move |handle| run_assembly(&standard_pipeline(), request, settings, collaborators, handle)
}

/// Run `pipeline` for one request.
///
/// The working directory lives under `temp_root` for the duration of the
/// call and is removed afterwards unless `retain_work_dirs` is set.
pub fn run_assembly(
    pipeline: &Pipeline,
    request: AssemblyRequest,
    settings: Settings,
    collaborators: Collaborators,
    handle: &ProgressHandle,
) -> PipelineResult<AssemblyResult> {
    let run_id = handle.run_id().to_string();
    handle.register_steps(&pipeline.step_names())?;

    let work_dir = WorkDir::create(
        &settings.paths.temp_root,
        &run_id,
        settings.paths.retain_work_dirs,
    )
    .map_err(|e| {
        PipelineError::setup_failed(&run_id, format!("cannot create working directory: {}", e))
    })?;

    let logger = RunLoggerBuilder::new(&run_id, &settings.paths.logs_folder)
        .config(LogConfig::from(&settings.logging))
        .build()
        .map_err(|e| PipelineError::setup_failed(&run_id, format!("cannot open run log: {}", e)))?;
    let logger = Arc::new(logger);

    logger.info(&format!(
        "Assembling {} input(s), numbering {}, visa type {}",
        request.item_count(),
        request.options.numbering_style,
        request.options.visa_type
    ));

    let ctx = Context::new(
        &run_id,
        request,
        settings,
        collaborators,
        work_dir.path().to_path_buf(),
        Arc::clone(&logger),
    );
    let mut run = RunState::new(&run_id);

    pipeline.run(&ctx, &mut run, handle)?;

    let mut result = run.result.take().ok_or_else(|| {
        PipelineError::step_failed(
            &run_id,
            StepName::Finalize,
            StepError::invalid_output("no result recorded"),
        )
    })?;
    result.warnings = std::mem::take(&mut run.warnings);
    if !result.warnings.is_empty() {
        logger.info(&format!("Completed with {} warning(s)", result.warnings.len()));
    }
    logger.close();

    drop(work_dir);
    Ok(result)
}
