//! The payload a successful run produces.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::exhibit::Exhibit;

/// Final output of one assembly run.
///
/// Attached to the processing state only after the finalize step, so a
/// reader never sees it partially populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyResult {
    /// Durable package file; absent when no exhibits were produced.
    pub output_file: Option<PathBuf>,
    pub exhibit_list: Vec<Exhibit>,
    pub total_pages: u32,
    /// Sum of source sizes before compression, in bytes.
    pub original_size: u64,
    /// Sum of source sizes after compression, in bytes.
    pub compressed_size: u64,
    /// `1 - compressed/original`, or 0 when nothing was measured.
    pub average_reduction: f64,
    #[serde(default)]
    pub compression_method: Option<String>,
    pub cover_letter_path: Option<PathBuf>,
    pub filing_instructions_path: Option<PathBuf>,
    /// Soft failures collected across all steps.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl AssemblyResult {
    pub fn exhibit_count(&self) -> usize {
        self.exhibit_list.len()
    }

    /// True for the degenerate zero-exhibit outcome.
    pub fn is_empty(&self) -> bool {
        self.output_file.is_none() && self.exhibit_list.is_empty()
    }

    /// Reduction as a percentage for display.
    pub fn reduction_percent(&self) -> f64 {
        self.average_reduction * 100.0
    }
}

/// Aggregate compression ratio, 0 when the original size is unknown.
pub fn average_reduction(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    1.0 - (compressed_size as f64 / original_size as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_reduction_handles_zero_original() {
        assert_eq!(average_reduction(0, 0), 0.0);
        assert_eq!(average_reduction(0, 100), 0.0);
    }

    #[test]
    fn average_reduction_is_a_fraction() {
        let r = average_reduction(1000, 250);
        assert!((r - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn default_result_is_empty() {
        let result = AssemblyResult::default();
        assert!(result.is_empty());
        assert_eq!(result.exhibit_count(), 0);
    }
}
