//! Core types for the assembly pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collaborators::Collaborators;
use crate::config::Settings;
use crate::logging::RunLogger;
use crate::models::{
    AssemblyOptions, AssemblyRequest, AssemblyResult, CompressionInfo, Exhibit, FeatureOutcome,
    StepName,
};
use crate::processor::ProgressHandle;

use super::errors::StepResult;

/// Read-only context passed to pipeline steps.
///
/// Holds the request and shared resources. Anything a step produces goes
/// into [`RunState`].
pub struct Context {
    pub run_id: String,
    pub request: AssemblyRequest,
    pub settings: Settings,
    pub collaborators: Collaborators,
    /// Private working directory of this run.
    pub work_dir: PathBuf,
    /// Durable directory for this run's artifacts.
    pub output_dir: PathBuf,
    pub logger: Arc<RunLogger>,
}

impl Context {
    pub fn new(
        run_id: impl Into<String>,
        request: AssemblyRequest,
        settings: Settings,
        collaborators: Collaborators,
        work_dir: PathBuf,
        logger: Arc<RunLogger>,
    ) -> Self {
        let run_id = run_id.into();
        let output_dir = Path::new(&settings.paths.output_folder).join(&run_id);
        Self {
            run_id,
            request,
            settings,
            collaborators,
            work_dir,
            output_dir,
            logger,
        }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.request.options
    }

    pub fn visa_type(&self) -> &str {
        &self.request.options.visa_type
    }

    /// Directory archive-extracted inputs must come from.
    pub fn extraction_root(&self) -> &Path {
        Path::new(&self.settings.paths.extraction_root)
    }

    /// Path of a file inside the working directory.
    pub fn work_path(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }
}

/// One input copied into the working directory.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedFile {
    /// Display name (the source filename).
    pub name: String,
    pub path: PathBuf,
    /// Set once the file has been compressed successfully.
    pub compression: Option<CompressionInfo>,
}

/// Mutable run state that accumulates what the steps produce.
#[derive(Debug, Default)]
pub struct RunState {
    pub run_id: String,
    /// Working set in exhibit order.
    pub files: Vec<MaterializedFile>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_method: Option<String>,
    pub exhibits: Vec<Exhibit>,
    /// Numbered copies, parallel to `exhibits`.
    pub numbered_files: Vec<PathBuf>,
    pub toc_path: Option<PathBuf>,
    pub cover_letter: FeatureOutcome<PathBuf>,
    pub filing_instructions: FeatureOutcome<PathBuf>,
    /// Package inside the working directory, before it is made durable.
    pub package_path: Option<PathBuf>,
    pub result: Option<AssemblyResult>,
    /// Soft failures from every step so far.
    pub warnings: Vec<String>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    pub fn has_exhibits(&self) -> bool {
        !self.exhibits.is_empty()
    }
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Nothing to do; the step still completes.
    Skipped(String),
}

/// Progress and soft-failure reporting for the step being executed.
pub struct StepProgress {
    handle: ProgressHandle,
    step: StepName,
    logger: Arc<RunLogger>,
    warnings: Mutex<Vec<String>>,
}

impl StepProgress {
    pub fn new(handle: ProgressHandle, step: StepName, logger: Arc<RunLogger>) -> Self {
        Self {
            handle,
            step,
            logger,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn step(&self) -> StepName {
        self.step
    }

    pub fn set(&self, percent: f64) -> StepResult<()> {
        self.handle.set_step_progress(self.step, percent)?;
        let logged = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        self.logger.progress(logged.round() as u32);
        Ok(())
    }

    /// Progress as the fraction of items done.
    pub fn items(&self, done: usize, total: usize) -> StepResult<()> {
        if total == 0 {
            return self.set(100.0);
        }
        self.set(done as f64 * 100.0 / total as f64)
    }

    /// Record a soft failure; the step keeps running.
    pub fn warn(&self, message: impl Into<String>) -> StepResult<()> {
        let message = message.into();
        self.logger.warn(&message);
        self.handle.record_step_warning(self.step, message.clone())?;
        self.warnings.lock().push(message);
        Ok(())
    }

    pub fn detail(&self, line: &str) {
        self.logger.detail(line);
    }

    pub(crate) fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::models::StepStatus;
    use tempfile::tempdir;

    #[test]
    fn run_state_starts_empty() {
        let run = RunState::new("run-1");
        assert_eq!(run.run_id, "run-1");
        assert!(!run.has_exhibits());
        assert!(run.cover_letter.as_produced().is_none());
    }

    #[test]
    fn step_progress_reports_items_and_warnings() {
        let dir = tempdir().unwrap();
        let handle = ProgressHandle::detached("run-1");
        handle
            .update_step(StepName::Compress, StepStatus::Running, None)
            .unwrap();
        let logger = Arc::new(RunLogger::new("run-1", dir.path(), LogConfig::default(), None).unwrap());
        let progress = StepProgress::new(handle.clone(), StepName::Compress, logger);

        progress.items(1, 4).unwrap();
        progress.warn("b.pdf could not be compressed").unwrap();

        let snapshot = handle.snapshot();
        let step = snapshot.step(StepName::Compress).unwrap();
        assert_eq!(step.progress(), 25);
        assert_eq!(step.warnings().len(), 1);
        assert_eq!(progress.take_warnings().len(), 1);
        assert!(progress.take_warnings().is_empty());
    }

    #[test]
    fn zero_items_means_done() {
        let dir = tempdir().unwrap();
        let handle = ProgressHandle::detached("run-2");
        handle
            .update_step(StepName::Extract, StepStatus::Running, None)
            .unwrap();
        let logger = Arc::new(RunLogger::new("run-2", dir.path(), LogConfig::default(), None).unwrap());
        let progress = StepProgress::new(handle.clone(), StepName::Extract, logger);

        progress.items(0, 0).unwrap();
        assert_eq!(handle.snapshot().step(StepName::Extract).unwrap().progress(), 100);
    }
}
