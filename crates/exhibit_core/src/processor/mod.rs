//! Background execution of one pipeline run.
//!
//! [`BackgroundProcessor`] owns a [`ProcessingState`] behind a
//! `parking_lot::RwLock`. The worker thread is the only writer (through a
//! [`ProgressHandle`]); pollers take whole-state snapshots through
//! [`BackgroundProcessor::state`], so they never observe a half-applied
//! update.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::models::{AssemblyResult, OverallStatus, StepName, StepStatus};
use crate::orchestrator::{PipelineError, PipelineResult};
use crate::state::{ProcessingState, StateResult};

/// Errors from controlling the processor.
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("A run is already in progress")]
    AlreadyRunning,

    #[error("Previous run is {0}; reset before starting another")]
    NotReset(OverallStatus),

    #[error("Cannot reset while a run is in progress")]
    ResetWhileRunning,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Write access to the processing state for the running pipeline.
#[derive(Clone)]
pub struct ProgressHandle {
    state: Arc<RwLock<ProcessingState>>,
    run_id: String,
}

impl ProgressHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Register steps as pending so pollers see the full plan up front.
    pub fn register_steps(&self, names: &[StepName]) -> StateResult<()> {
        let mut state = self.state.write();
        for &name in names {
            state.update_step(name, StepStatus::Pending, None)?;
        }
        Ok(())
    }

    pub fn update_step(
        &self,
        name: StepName,
        status: StepStatus,
        error_message: Option<String>,
    ) -> StateResult<()> {
        self.state.write().update_step(name, status, error_message)
    }

    pub fn set_step_progress(&self, name: StepName, percent: f64) -> StateResult<()> {
        self.state.write().set_step_progress(name, percent)
    }

    pub fn complete_step(&self, name: StepName) -> StateResult<()> {
        self.state.write().complete_step(name)
    }

    pub fn record_step_warning(&self, name: StepName, message: impl Into<String>) -> StateResult<()> {
        self.state.write().record_step_warning(name, message)
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> ProcessingState {
        self.state.read().clone()
    }

    /// A handle over its own running state, not owned by any processor.
    #[cfg(test)]
    pub(crate) fn detached(run_id: &str) -> Self {
        let mut state = ProcessingState::new();
        let _ = state.begin(run_id);
        Self {
            state: Arc::new(RwLock::new(state)),
            run_id: run_id.to_string(),
        }
    }
}

/// Runs one pipeline at a time on a dedicated worker thread.
pub struct BackgroundProcessor {
    state: Arc<RwLock<ProcessingState>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    delivered: AtomicBool,
    thread_name: String,
}

impl BackgroundProcessor {
    pub fn new() -> Self {
        Self::with_thread_name("exhibit-assembly")
    }

    /// Name given to worker threads (visible in panics and debuggers).
    pub fn with_thread_name(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ProcessingState::new())),
            worker: Mutex::new(None),
            delivered: AtomicBool::new(false),
            thread_name: name.into(),
        }
    }

    /// Discard the previous run and return to idle.
    ///
    /// Refused while a run is in progress.
    pub fn reset(&self) -> ProcessorResult<()> {
        {
            let mut state = self.state.write();
            if state.is_running() {
                return Err(ProcessorError::ResetWhileRunning);
            }
            *state = ProcessingState::new();
            self.delivered.store(false, Ordering::SeqCst);
        }
        self.join_finished_worker();
        Ok(())
    }

    /// Launch `pipeline` on the worker thread and return its run id.
    ///
    /// Returns immediately. The state must be idle: a running state is
    /// rejected, a finished one must be reset first.
    pub fn start_processing<F>(&self, pipeline: F) -> ProcessorResult<String>
    where
        F: FnOnce(&ProgressHandle) -> PipelineResult<AssemblyResult> + Send + 'static,
    {
        let run_id = uuid::Uuid::new_v4().to_string();

        {
            let mut state = self.state.write();
            match state.status() {
                OverallStatus::Idle => {}
                OverallStatus::Running => return Err(ProcessorError::AlreadyRunning),
                other => return Err(ProcessorError::NotReset(other)),
            }
            state
                .begin(run_id.clone())
                .map_err(|_| ProcessorError::AlreadyRunning)?;
        }
        self.join_finished_worker();

        let handle = ProgressHandle {
            state: Arc::clone(&self.state),
            run_id: run_id.clone(),
        };
        let shared = Arc::clone(&self.state);

        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| pipeline(&handle)));
                let mut state = shared.write();
                match outcome {
                    Ok(Ok(result)) => {
                        if let Err(e) = state.finish(result) {
                            tracing::error!(run_id = %handle.run_id, "Run could not complete: {}", e);
                        } else {
                            tracing::info!(run_id = %handle.run_id, "Run complete");
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::error!(run_id = %handle.run_id, "Run failed: {}", e);
                        state.fail(e.to_string());
                    }
                    Err(payload) => {
                        let e = PipelineError::worker_panicked(panic_message(payload.as_ref()));
                        tracing::error!(run_id = %handle.run_id, "{}", e);
                        state.fail(e.to_string());
                    }
                }
            });

        match spawned {
            Ok(join) => {
                *self.worker.lock() = Some(join);
                Ok(run_id)
            }
            Err(e) => {
                self.state
                    .write()
                    .fail(format!("Failed to start worker: {}", e));
                Err(ProcessorError::Spawn(e))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.read().is_running()
    }

    pub fn is_complete(&self) -> bool {
        self.state.read().is_complete()
    }

    pub fn has_error(&self) -> bool {
        self.state.read().has_error()
    }

    /// Consistent snapshot of the processing state.
    pub fn state(&self) -> ProcessingState {
        self.state.read().clone()
    }

    /// The result, the first time it is asked for after completion.
    ///
    /// Later calls return `None` until the next run completes.
    pub fn take_result(&self) -> Option<AssemblyResult> {
        let state = self.state.read();
        let result = state.result()?;
        if self.delivered.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(result.clone())
    }

    /// Block until the current worker exits and return the final snapshot.
    pub fn wait(&self) -> ProcessingState {
        let worker = self.worker.lock().take();
        if let Some(join) = worker {
            let _ = join.join();
        }
        self.state()
    }

    fn join_finished_worker(&self) {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| w.is_finished()) {
            if let Some(join) = worker.take() {
                let _ = join.join();
            }
        }
    }
}

impl Default for BackgroundProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    use crate::orchestrator::StepError;

    fn quick_success(handle: &ProgressHandle) -> PipelineResult<AssemblyResult> {
        handle.register_steps(&[StepName::Extract])?;
        handle.update_step(StepName::Extract, StepStatus::Running, None)?;
        handle.set_step_progress(StepName::Extract, 50.0)?;
        handle.complete_step(StepName::Extract)?;
        Ok(AssemblyResult {
            total_pages: 7,
            ..Default::default()
        })
    }

    #[test]
    fn run_completes_and_exposes_result() {
        let processor = BackgroundProcessor::new();
        let run_id = processor.start_processing(quick_success).unwrap();
        let state = processor.wait();

        assert!(state.is_complete());
        assert_eq!(state.run_id(), Some(run_id.as_str()));
        assert_eq!(state.result().unwrap().total_pages, 7);
        assert!(processor.is_complete());
        assert!(!processor.is_running());
    }

    #[test]
    fn take_result_delivers_exactly_once() {
        let processor = BackgroundProcessor::new();
        processor.start_processing(quick_success).unwrap();
        processor.wait();

        assert!(processor.take_result().is_some());
        assert!(processor.take_result().is_none());
        assert!(processor.state().result().is_some());

        processor.reset().unwrap();
        processor.start_processing(quick_success).unwrap();
        processor.wait();
        assert!(processor.take_result().is_some());
    }

    #[test]
    fn pipeline_error_becomes_fatal_state() {
        let processor = BackgroundProcessor::new();
        processor
            .start_processing(|handle| {
                handle.register_steps(&[StepName::Extract, StepName::Compress])?;
                handle.update_step(StepName::Extract, StepStatus::Running, None)?;
                Err(PipelineError::step_failed(
                    handle.run_id(),
                    StepName::Extract,
                    StepError::other("cannot create working area"),
                ))
            })
            .unwrap();
        let state = processor.wait();

        assert!(state.has_error());
        assert!(state.result().is_none());
        assert!(state
            .error_message()
            .unwrap()
            .contains("cannot create working area"));
        assert_eq!(
            state.step(StepName::Compress).unwrap().status(),
            StepStatus::Pending
        );
    }

    #[test]
    fn panic_is_caught_and_reported() {
        let processor = BackgroundProcessor::new();
        processor
            .start_processing(|handle| {
                handle.register_steps(&[StepName::Number])?;
                handle.update_step(StepName::Number, StepStatus::Running, None)?;
                panic!("collaborator exploded");
            })
            .unwrap();
        let state = processor.wait();

        assert!(state.has_error());
        assert!(state
            .error_message()
            .unwrap()
            .contains("collaborator exploded"));
        assert_eq!(
            state.step(StepName::Number).unwrap().status(),
            StepStatus::Running
        );
    }

    #[test]
    fn start_while_running_is_rejected_without_touching_state() {
        let processor = BackgroundProcessor::new();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<()>();

        let first = processor
            .start_processing(move |handle| {
                handle.register_steps(&[StepName::Extract])?;
                handle.update_step(StepName::Extract, StepStatus::Running, None)?;
                handle.set_step_progress(StepName::Extract, 30.0)?;
                let _ = ready_tx.send(());
                let _ = release_rx.recv_timeout(Duration::from_secs(10));
                handle.complete_step(StepName::Extract)?;
                Ok(AssemblyResult::default())
            })
            .unwrap();
        ready_rx.recv_timeout(Duration::from_secs(10)).unwrap();

        let second = processor.start_processing(quick_success);
        assert!(matches!(second, Err(ProcessorError::AlreadyRunning)));
        assert!(matches!(
            processor.reset(),
            Err(ProcessorError::ResetWhileRunning)
        ));

        let snapshot = processor.state();
        assert_eq!(snapshot.run_id(), Some(first.as_str()));
        assert_eq!(snapshot.steps().len(), 1);
        assert_eq!(snapshot.step(StepName::Extract).unwrap().progress(), 30);

        release_tx.send(()).unwrap();
        assert!(processor.wait().is_complete());
    }

    #[test]
    fn finished_run_requires_reset() {
        let processor = BackgroundProcessor::new();
        processor.start_processing(quick_success).unwrap();
        processor.wait();

        let again = processor.start_processing(quick_success);
        assert!(matches!(
            again,
            Err(ProcessorError::NotReset(OverallStatus::Complete))
        ));
    }

    #[test]
    fn reset_is_idempotent_from_any_settled_state() {
        let processor = BackgroundProcessor::new();
        processor.reset().unwrap();
        assert!(processor.state().is_idle());

        processor.start_processing(quick_success).unwrap();
        processor.wait();
        processor.reset().unwrap();
        processor.reset().unwrap();
        let state = processor.state();
        assert!(state.is_idle());
        assert!(state.steps().is_empty());
        assert!(state.result().is_none());

        processor
            .start_processing(|_| Err(PipelineError::setup_failed("r", "no disk")))
            .unwrap();
        processor.wait();
        processor.reset().unwrap();
        let state = processor.state();
        assert!(state.is_idle());
        assert!(state.error_message().is_none());
    }

    #[test]
    fn progress_observed_by_poller_never_decreases() {
        let processor = BackgroundProcessor::new();
        processor
            .start_processing(|handle| {
                handle.register_steps(&[StepName::Compress])?;
                handle.update_step(StepName::Compress, StepStatus::Running, None)?;
                for p in [10.0, 5.0, 40.0, 20.0, 80.0, 60.0, 100.0] {
                    handle.set_step_progress(StepName::Compress, p)?;
                    thread::sleep(Duration::from_millis(2));
                }
                handle.complete_step(StepName::Compress)?;
                Ok(AssemblyResult::default())
            })
            .unwrap();

        let mut last = 0;
        loop {
            let state = processor.state();
            if let Some(step) = state.step(StepName::Compress) {
                assert!(step.progress() >= last);
                last = step.progress();
            }
            // Complete implies the result is attached in the same snapshot.
            assert_eq!(state.is_complete(), state.result().is_some());
            if !state.is_running() {
                break;
            }
            thread::yield_now();
        }
        assert!(processor.wait().is_complete());
    }
}
