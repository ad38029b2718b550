//! Inputs to one assembly run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::{NumberingStyle, QualityPreset};

/// Where an uploaded file's bytes live.
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Content already held in memory.
    Bytes(Vec<u8>),
    /// Content read lazily from disk.
    Path(PathBuf),
}

/// One uploaded source document.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub source: InputSource,
}

impl InputFile {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: InputSource::Bytes(bytes),
        }
    }

    /// Uses the path's file name as the display name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        Self {
            name,
            source: InputSource::Path(path),
        }
    }

    /// Read the full content.
    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        match &self.source {
            InputSource::Bytes(bytes) => Ok(bytes.clone()),
            InputSource::Path(path) => fs::read(path),
        }
    }
}

/// One entry of a reviewed exhibit ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhibitOrderEntry {
    /// Source filename the entry refers to.
    pub filename: String,
    /// Title chosen during review; overrides generated labels.
    #[serde(default)]
    pub title: Option<String>,
}

/// Exhibit order produced by a manual review stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhibitOrder {
    #[serde(default)]
    pub entries: Vec<ExhibitOrderEntry>,
}

impl ExhibitOrder {
    /// Position of a filename in the reviewed order.
    pub fn position(&self, filename: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.filename == filename)
    }

    /// Reviewed title for a filename.
    pub fn title_for(&self, filename: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.filename == filename)
            .and_then(|e| e.title.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Compression configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub quality: QualityPreset,

    /// Key for an external compression service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            quality: QualityPreset::default(),
            api_key: None,
        }
    }
}

/// The configuration object handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyOptions {
    #[serde(default)]
    pub numbering_style: NumberingStyle,

    #[serde(default = "default_true")]
    pub generate_toc: bool,

    #[serde(default = "default_true")]
    pub generate_cover_letter: bool,

    #[serde(default)]
    pub generate_filing_instructions: bool,

    #[serde(default = "default_true")]
    pub merge_into_single_file: bool,

    #[serde(default)]
    pub include_full_text_and_images: bool,

    #[serde(default = "default_visa_type")]
    pub visa_type: String,

    #[serde(default)]
    pub compression: CompressionOptions,
}

fn default_true() -> bool {
    true
}

fn default_visa_type() -> String {
    "O-1A".to_string()
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            numbering_style: NumberingStyle::default(),
            generate_toc: true,
            generate_cover_letter: true,
            generate_filing_instructions: false,
            merge_into_single_file: true,
            include_full_text_and_images: false,
            visa_type: default_visa_type(),
            compression: CompressionOptions::default(),
        }
    }
}

/// Case details used by the cover letter and filing instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseData {
    pub beneficiary_name: String,
    pub petitioner_name: String,
    pub service_center: String,
    pub nationality: String,
    pub job_title: String,
    pub field: String,
    pub duration: String,
    pub processing_type: String,
    pub filing_fee: String,
    pub premium_fee: String,
    pub criteria_met: Vec<String>,
}

impl Default for CaseData {
    fn default() -> Self {
        Self {
            beneficiary_name: "Beneficiary".to_string(),
            petitioner_name: "Petitioner".to_string(),
            service_center: "California Service Center".to_string(),
            nationality: String::new(),
            job_title: String::new(),
            field: String::new(),
            duration: "3 years".to_string(),
            processing_type: "Regular".to_string(),
            filing_fee: "$460".to_string(),
            premium_fee: "$2,805".to_string(),
            criteria_met: Vec::new(),
        }
    }
}

/// Everything one run needs.
#[derive(Debug, Clone, Default)]
pub struct AssemblyRequest {
    /// Uploaded files in input order.
    pub uploads: Vec<InputFile>,
    /// Files already extracted from archives, must lie under the extraction root.
    pub archive_paths: Vec<PathBuf>,
    /// Reviewed order; input order when absent.
    pub ordering: Option<ExhibitOrder>,
    pub options: AssemblyOptions,
    pub case: CaseData,
}

impl AssemblyRequest {
    pub fn new(options: AssemblyOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn with_upload(mut self, file: InputFile) -> Self {
        self.uploads.push(file);
        self
    }

    pub fn with_archive_path(mut self, path: impl AsRef<Path>) -> Self {
        self.archive_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_ordering(mut self, ordering: ExhibitOrder) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn with_case(mut self, case: CaseData) -> Self {
        self.case = case;
        self
    }

    /// Total number of items the extract step will try to materialize.
    pub fn item_count(&self) -> usize {
        self.uploads.len() + self.archive_paths.len()
    }
}
