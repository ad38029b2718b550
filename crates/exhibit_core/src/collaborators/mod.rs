//! Contracts for the external services the pipeline calls out to.
//!
//! The pipeline only sees these traits. Default implementations backed by
//! `lopdf` and plain-text rendering live in the submodules so the crate
//! works end to end without any network service.

mod compress;
#[cfg(test)]
pub mod fakes;
mod labeling;
mod pdf;
mod templates;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CaseData, CompressionOptions, Exhibit, ExhibitAnalysis};

pub use compress::LocalCompressor;
pub use labeling::RuleBasedLabeler;
pub use pdf::{LopdfToolkit, TextPdf};
pub use templates::MarkdownRenderer;

/// Errors raised by collaborators.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Unsupported input: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

impl CollaboratorError {
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// What a compressor reports for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionOutcome {
    pub success: bool,
    pub original_size: u64,
    pub compressed_size: u64,
    pub reduction_percent: f64,
    pub method: String,
}

impl CompressionOutcome {
    /// Successful outcome with the reduction derived from the sizes.
    pub fn measured(original_size: u64, compressed_size: u64, method: impl Into<String>) -> Self {
        let reduction_percent = if original_size == 0 {
            0.0
        } else {
            (1.0 - compressed_size as f64 / original_size as f64) * 100.0
        };
        Self {
            success: true,
            original_size,
            compressed_size,
            reduction_percent,
            method: method.into(),
        }
    }
}

/// Extra content for an exhibit's cover page.
///
/// The default value produces a cover page carrying only the number.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverContent<'a> {
    pub title: Option<&'a str>,
    pub summary: Option<&'a str>,
    /// Appended after the exhibit as plain-text pages.
    pub extracted_text: Option<&'a str>,
    /// Source bytes already in memory, to avoid re-reading the file.
    pub content_bytes: Option<&'a [u8]>,
}

impl CoverContent<'_> {
    pub fn number_only() -> Self {
        Self::default()
    }
}

/// Reduces the size of a PDF in place.
pub trait Compressor: Send + Sync {
    fn compress(
        &self,
        path: &Path,
        options: &CompressionOptions,
    ) -> CollaboratorResult<CompressionOutcome>;
}

/// Derives titles and content analysis for a document.
pub trait DocumentLabeler: Send + Sync {
    fn generate_short_label(
        &self,
        content: &[u8],
        filename: &str,
        visa_type: &str,
    ) -> CollaboratorResult<Option<String>>;

    fn analyze_pdf(
        &self,
        content: &[u8],
        filename: &str,
        visa_type: &str,
    ) -> CollaboratorResult<Option<ExhibitAnalysis>>;

    /// Plain text of the document, truncated to `max_chars` characters.
    fn extract_text(&self, content: &[u8], max_chars: usize) -> CollaboratorResult<Option<String>>;
}

/// Page-level PDF operations.
pub trait PdfToolkit: Send + Sync {
    fn page_count(&self, path: &Path) -> CollaboratorResult<u32>;

    /// Write a copy of `path` with a numbered cover page and return its path.
    fn add_exhibit_number_with_cover(
        &self,
        path: &Path,
        number: &str,
        cover: &CoverContent<'_>,
    ) -> CollaboratorResult<PathBuf>;

    fn generate_table_of_contents(
        &self,
        exhibits: &[Exhibit],
        visa_type: &str,
        destination: &Path,
    ) -> CollaboratorResult<PathBuf>;

    /// Concatenate `paths` in order into `destination`.
    fn merge(&self, paths: &[PathBuf], destination: &Path) -> CollaboratorResult<PathBuf>;
}

/// Renders the ancillary documents. `Ok(None)` means nothing was produced.
pub trait DocumentRenderer: Send + Sync {
    fn generate_cover_letter(
        &self,
        case: &CaseData,
        visa_type: &str,
        exhibits: &[Exhibit],
        destination: &Path,
    ) -> CollaboratorResult<Option<PathBuf>>;

    fn generate_filing_instructions(
        &self,
        case: &CaseData,
        visa_type: &str,
        exhibits: &[Exhibit],
        destination: &Path,
    ) -> CollaboratorResult<Option<PathBuf>>;
}

/// The set of collaborators one run uses.
#[derive(Clone)]
pub struct Collaborators {
    pub pdf: Arc<dyn PdfToolkit>,
    pub compressor: Arc<dyn Compressor>,
    pub labeler: Arc<dyn DocumentLabeler>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl Collaborators {
    /// Local implementations with no external services.
    pub fn standard() -> Self {
        Self {
            pdf: Arc::new(LopdfToolkit::new()),
            compressor: Arc::new(LocalCompressor::new()),
            labeler: Arc::new(RuleBasedLabeler::new()),
            renderer: Arc::new(MarkdownRenderer::new()),
        }
    }

    pub fn with_pdf(mut self, pdf: Arc<dyn PdfToolkit>) -> Self {
        self.pdf = pdf;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn with_labeler(mut self, labeler: Arc<dyn DocumentLabeler>) -> Self {
        self.labeler = labeler;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
