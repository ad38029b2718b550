//! Core enums used throughout the assembler.

use serde::{Deserialize, Serialize};

/// Identifier of one unit of trackable work in the assembly pipeline.
///
/// Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Extract,
    Compress,
    Number,
    Toc,
    Cover,
    FilingInstructions,
    Merge,
    Finalize,
}

impl StepName {
    /// Every step in execution order.
    pub const ALL: [StepName; 8] = [
        StepName::Extract,
        StepName::Compress,
        StepName::Number,
        StepName::Toc,
        StepName::Cover,
        StepName::FilingInstructions,
        StepName::Merge,
        StepName::Finalize,
    ];

    /// Stable identifier used in logs and serialized state.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Extract => "extract",
            StepName::Compress => "compress",
            StepName::Number => "number",
            StepName::Toc => "toc",
            StepName::Cover => "cover",
            StepName::FilingInstructions => "filing_instructions",
            StepName::Merge => "merge",
            StepName::Finalize => "finalize",
        }
    }

    /// Human-readable label for presenters.
    pub fn label(&self) -> &'static str {
        match self {
            StepName::Extract => "Extracting files",
            StepName::Compress => "Compressing PDFs",
            StepName::Number => "Numbering exhibits",
            StepName::Toc => "Generating table of contents",
            StepName::Cover => "Generating cover letter",
            StepName::FilingInstructions => "Generating filing instructions",
            StepName::Merge => "Merging package",
            StepName::Finalize => "Finalizing",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Complete,
    Error,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Complete => write!(f, "complete"),
            StepStatus::Error => write!(f, "error"),
        }
    }
}

/// Status of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Never started (or reset).
    #[default]
    Idle,
    Running,
    Complete,
    Error,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Idle => write!(f, "idle"),
            OverallStatus::Running => write!(f, "running"),
            OverallStatus::Complete => write!(f, "complete"),
            OverallStatus::Error => write!(f, "error"),
        }
    }
}

/// Display scheme for exhibit labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingStyle {
    /// A, B, ... Z, AA, AB, ...
    #[default]
    Letters,
    /// 1, 2, 3, ...
    Numbers,
    /// I, II, III, ...
    Roman,
}

impl std::fmt::Display for NumberingStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberingStyle::Letters => write!(f, "letters"),
            NumberingStyle::Numbers => write!(f, "numbers"),
            NumberingStyle::Roman => write!(f, "roman"),
        }
    }
}

impl std::str::FromStr for NumberingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "letters" | "letter" => Ok(NumberingStyle::Letters),
            "numbers" | "number" => Ok(NumberingStyle::Numbers),
            "roman" => Ok(NumberingStyle::Roman),
            other => Err(format!("unknown numbering style '{}'", other)),
        }
    }
}

/// Compression quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    /// Lossless stream compression only.
    #[default]
    High,
    /// Compression plus removal of unreferenced objects.
    Balanced,
    /// Everything in balanced plus dropping empty streams.
    Maximum,
}

impl std::fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityPreset::High => write!(f, "high"),
            QualityPreset::Balanced => write!(f, "balanced"),
            QualityPreset::Maximum => write!(f, "maximum"),
        }
    }
}

impl std::str::FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(QualityPreset::High),
            "balanced" => Ok(QualityPreset::Balanced),
            "maximum" | "max" => Ok(QualityPreset::Maximum),
            other => Err(format!("unknown quality preset '{}'", other)),
        }
    }
}
