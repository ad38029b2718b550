//! Pipeline step implementations.
//!
//! Each step handles one phase of exhibit assembly.

mod ancillary;
mod compress;
mod extract;
mod finalize;
mod merge;
mod number;
mod toc;

pub use ancillary::{
    CoverLetterStep, FilingInstructionsStep, COVER_LETTER_FILE, FILING_INSTRUCTIONS_FILE,
};
pub use compress::CompressStep;
pub use extract::ExtractStep;
pub use finalize::FinalizeStep;
pub use merge::{MergeStep, PACKAGE_FILE};
pub use number::{NumberStep, MAX_FULL_TEXT_CHARS};
pub use toc::{TocStep, TOC_FILE};
