//! Data models for the exhibit assembler.
//!
//! - Enums for step identifiers, statuses and numbering styles
//! - Exhibit records and best-effort feature outcomes
//! - Run inputs (uploads, ordering, options, case data)
//! - The final assembly result

mod enums;
mod exhibit;
mod request;
mod result;

pub use enums::{NumberingStyle, OverallStatus, QualityPreset, StepName, StepStatus};
pub use exhibit::{CompressionInfo, Exhibit, ExhibitAnalysis, FeatureOutcome};
pub use request::{
    AssemblyOptions, AssemblyRequest, CaseData, CompressionOptions, ExhibitOrder,
    ExhibitOrderEntry, InputFile, InputSource,
};
pub use result::{average_reduction, AssemblyResult};
