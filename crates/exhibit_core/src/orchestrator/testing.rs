//! Fixtures shared by the orchestrator tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use crate::collaborators::Collaborators;
use crate::config::Settings;
use crate::logging::{LogConfig, RunLogger};
use crate::models::{AssemblyRequest, StepName, StepStatus};
use crate::processor::ProgressHandle;

use super::types::{Context, MaterializedFile, StepProgress};

/// Settings with every directory inside `root`.
pub(crate) fn settings_in(root: &Path) -> Settings {
    let mut settings = Settings::default();
    let under = |name: &str| root.join(name).to_string_lossy().into_owned();
    settings.paths.output_folder = under("out");
    settings.paths.temp_root = under("tmp");
    settings.paths.logs_folder = under("logs");
    settings.paths.extraction_root = under("tmp/extracted");
    settings
}

/// A context over a scratch directory plus a detached progress handle.
pub(crate) struct Fixture {
    _dir: TempDir,
    pub ctx: Context,
    pub handle: ProgressHandle,
}

impl Fixture {
    pub fn new(request: AssemblyRequest, collaborators: Collaborators) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_in(dir.path());
        let work_dir = dir.path().join("work");
        fs::create_dir_all(&work_dir).expect("work dir");
        let logger = RunLogger::new("test-run", &settings.paths.logs_folder, LogConfig::debug(), None)
            .expect("logger");
        let ctx = Context::new(
            "test-run",
            request,
            settings,
            collaborators,
            work_dir,
            Arc::new(logger),
        );
        Self {
            _dir: dir,
            ctx,
            handle: ProgressHandle::detached("test-run"),
        }
    }

    /// Mark `step` running and return its progress reporter.
    pub fn progress(&self, step: StepName) -> StepProgress {
        self.handle
            .update_step(step, StepStatus::Running, None)
            .expect("step running");
        StepProgress::new(self.handle.clone(), step, self.ctx.logger.clone())
    }

    /// Write `content` into the work directory as a materialized file.
    pub fn materialize(&self, name: &str, content: &[u8]) -> MaterializedFile {
        let path = self.ctx.work_dir.join(name);
        fs::write(&path, content).expect("write source");
        MaterializedFile {
            name: name.to_string(),
            path,
            compression: None,
        }
    }

    pub fn warnings(&self, step: StepName) -> Vec<String> {
        self.handle
            .snapshot()
            .step(step)
            .map(|s| s.warnings().to_vec())
            .unwrap_or_default()
    }
}
