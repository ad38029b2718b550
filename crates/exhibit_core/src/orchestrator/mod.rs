//! Assembly pipeline orchestration.
//!
//! A run is a fixed sequence of steps that share a read-only [`Context`]
//! and accumulate their output in a [`RunState`]:
//!
//! ```text
//! Pipeline
//!     ├── Step: extract
//!     ├── Step: compress
//!     ├── Step: number
//!     ├── Step: toc
//!     ├── Step: cover
//!     ├── Step: filing_instructions
//!     ├── Step: merge
//!     └── Step: finalize
//! ```
//!
//! # Example
//!
//! ```no_run
//! use exhibit_core::collaborators::Collaborators;
//! use exhibit_core::config::Settings;
//! use exhibit_core::models::{AssemblyRequest, InputFile};
//! use exhibit_core::orchestrator::assembly_job;
//! use exhibit_core::processor::BackgroundProcessor;
//!
//! let request = AssemblyRequest::default().with_upload(InputFile::from_path("cv.pdf"));
//! let processor = BackgroundProcessor::new();
//! processor
//!     .start_processing(assembly_job(request, Settings::default(), Collaborators::standard()))
//!     .unwrap();
//! let state = processor.wait();
//! println!("{:?}", state.status());
//! ```

mod assembly;
mod errors;
mod pipeline;
mod step;
pub mod steps;
mod types;
mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use assembly::{assembly_job, run_assembly, standard_pipeline};
pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::Pipeline;
pub use step::AssemblyStep;
pub use types::{Context, MaterializedFile, RunState, StepOutcome, StepProgress};
pub use workspace::WorkDir;
