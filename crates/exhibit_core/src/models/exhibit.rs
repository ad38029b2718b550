//! Exhibit records and per-feature outcomes.

use serde::{Deserialize, Serialize};

/// Compression applied to one exhibit's source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionInfo {
    /// Size reduction in percent (0-100).
    pub reduction: f64,
    /// Method reported by the compressor.
    pub method: String,
}

/// Content analysis of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExhibitAnalysis {
    pub summary: String,
    pub document_type: String,
    #[serde(default)]
    pub dates: Vec<String>,
    /// Government form identifiers found in the text (e.g. I-129).
    #[serde(default)]
    pub forms: Vec<String>,
    #[serde(default)]
    pub visa_mentions: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
}

/// One input document after numbering.
///
/// Created once during the number step and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exhibit {
    /// Display label ("A", "12", "IV").
    pub number: String,
    pub title: String,
    /// Source filename inside the working area.
    pub filename: String,
    pub pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ExhibitAnalysis>,
}

impl Exhibit {
    /// Short summary from the analysis, if any.
    pub fn summary(&self) -> Option<&str> {
        self.analysis
            .as_ref()
            .map(|a| a.summary.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Result of an optional, best-effort feature.
///
/// Separates "nothing to produce" from "tried and failed" so both can be
/// reported and tested.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOutcome<T> {
    Produced(T),
    NotProduced,
    Failed(String),
}

impl<T> FeatureOutcome<T> {
    /// Build from a collaborator result that may legitimately yield nothing.
    pub fn from_result<E: std::fmt::Display>(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(Some(value)) => FeatureOutcome::Produced(value),
            Ok(None) => FeatureOutcome::NotProduced,
            Err(e) => FeatureOutcome::Failed(e.to_string()),
        }
    }

    pub fn produced(self) -> Option<T> {
        match self {
            FeatureOutcome::Produced(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_produced(&self) -> Option<&T> {
        match self {
            FeatureOutcome::Produced(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            FeatureOutcome::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> Default for FeatureOutcome<T> {
    fn default() -> Self {
        FeatureOutcome::NotProduced
    }
}
