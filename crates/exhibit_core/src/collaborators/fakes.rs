//! Deterministic collaborators for tests.
//!
//! Fake documents are small text files whose first line is `pages:N`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    CollaboratorError, CollaboratorResult, Collaborators, CompressionOutcome, Compressor,
    CoverContent, DocumentLabeler, DocumentRenderer, PdfToolkit,
};
use crate::models::{CaseData, CompressionOptions, Exhibit, ExhibitAnalysis};

const PADDING: usize = 64;

/// Bytes of a fake document with `pages` pages.
pub fn pdf_bytes(pages: u32) -> Vec<u8> {
    let mut bytes = format!("pages:{}\n", pages).into_bytes();
    bytes.extend(std::iter::repeat(b'#').take(PADDING));
    bytes
}

fn pages_of(content: &[u8]) -> CollaboratorResult<u32> {
    let text = String::from_utf8_lossy(content);
    text.lines()
        .next()
        .and_then(|l| l.strip_prefix("pages:"))
        .and_then(|n| n.trim().parse().ok())
        .ok_or_else(|| CollaboratorError::unsupported("not a fake pdf"))
}

fn read(path: &Path) -> CollaboratorResult<Vec<u8>> {
    fs::read(path).map_err(|e| CollaboratorError::io(format!("reading {}", path.display()), e))
}

fn write(path: &Path, content: &[u8]) -> CollaboratorResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CollaboratorError::io(format!("creating {}", parent.display()), e))?;
    }
    fs::write(path, content).map_err(|e| CollaboratorError::io(format!("writing {}", path.display()), e))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[derive(Default)]
pub struct FakePdf {
    /// Rich covers (with a title) fail for these filenames.
    pub fail_rich_cover_for: HashSet<String>,
    /// Every cover request fails for these filenames.
    pub fail_all_covers_for: HashSet<String>,
    pub fail_toc: bool,
    pub fail_merge: bool,
    /// Numbers whose cover was built without a title.
    pub plain_covers: Mutex<Vec<String>>,
    /// Inputs of the last merge.
    pub merged_inputs: Mutex<Vec<PathBuf>>,
}

impl PdfToolkit for FakePdf {
    fn page_count(&self, path: &Path) -> CollaboratorResult<u32> {
        pages_of(&read(path)?)
    }

    fn add_exhibit_number_with_cover(
        &self,
        path: &Path,
        number: &str,
        cover: &CoverContent<'_>,
    ) -> CollaboratorResult<PathBuf> {
        let name = file_name(path);
        if self.fail_all_covers_for.contains(&name) {
            return Err(CollaboratorError::other(format!("cannot number {}", name)));
        }
        if cover.title.is_some() && self.fail_rich_cover_for.contains(&name) {
            return Err(CollaboratorError::other(format!("cover rendering failed for {}", name)));
        }
        if cover.title.is_none() {
            self.plain_covers.lock().push(number.to_string());
        }

        let pages = pages_of(&read(path)?)?;
        let destination = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("numbered")
            .join(format!("Exhibit_{}.pdf", number));
        let mut body = format!(
            "pages:{}\nexhibit:{}\ntitle:{}\n",
            pages + 1,
            number,
            cover.title.unwrap_or("")
        );
        if let Some(text) = cover.extracted_text {
            body.push_str(&format!("text:{}\n", text.chars().count()));
        }
        write(&destination, body.as_bytes())?;
        Ok(destination)
    }

    fn generate_table_of_contents(
        &self,
        exhibits: &[Exhibit],
        _visa_type: &str,
        destination: &Path,
    ) -> CollaboratorResult<PathBuf> {
        if self.fail_toc {
            return Err(CollaboratorError::other("toc renderer unavailable"));
        }
        let mut body = String::from("pages:1\n");
        for exhibit in exhibits {
            body.push_str(&format!("{}:{}\n", exhibit.number, exhibit.title));
        }
        write(destination, body.as_bytes())?;
        Ok(destination.to_path_buf())
    }

    fn merge(&self, paths: &[PathBuf], destination: &Path) -> CollaboratorResult<PathBuf> {
        if self.fail_merge {
            return Err(CollaboratorError::other("merge failed"));
        }
        *self.merged_inputs.lock() = paths.to_vec();
        let mut total = 0;
        for path in paths {
            total += pages_of(&read(path)?)?;
        }
        write(destination, format!("pages:{}\n", total).as_bytes())?;
        Ok(destination.to_path_buf())
    }
}

/// Strips the padding from fake documents.
#[derive(Default)]
pub struct FakeCompressor {
    pub fail_for: HashSet<String>,
}

impl Compressor for FakeCompressor {
    fn compress(
        &self,
        path: &Path,
        _options: &CompressionOptions,
    ) -> CollaboratorResult<CompressionOutcome> {
        let name = file_name(path);
        if self.fail_for.contains(&name) {
            return Err(CollaboratorError::other(format!("compression service rejected {}", name)));
        }
        let original = read(path)?;
        let pages = pages_of(&original)?;
        let compressed = format!("pages:{}\n", pages).into_bytes();
        write(path, &compressed)?;
        Ok(CompressionOutcome::measured(
            original.len() as u64,
            compressed.len() as u64,
            "fake",
        ))
    }
}

#[derive(Default)]
pub struct FakeLabeler {
    pub fail: bool,
    pub no_label: bool,
}

impl DocumentLabeler for FakeLabeler {
    fn generate_short_label(
        &self,
        _content: &[u8],
        filename: &str,
        _visa_type: &str,
    ) -> CollaboratorResult<Option<String>> {
        if self.fail {
            return Err(CollaboratorError::other("labeling service down"));
        }
        if self.no_label {
            return Ok(None);
        }
        let stem = filename.trim_end_matches(".pdf");
        Ok(Some(format!("Label {}", stem)))
    }

    fn analyze_pdf(
        &self,
        _content: &[u8],
        filename: &str,
        _visa_type: &str,
    ) -> CollaboratorResult<Option<ExhibitAnalysis>> {
        if self.fail {
            return Err(CollaboratorError::other("analysis service down"));
        }
        Ok(Some(ExhibitAnalysis {
            summary: format!("Summary of {}", filename),
            document_type: "Evidence".to_string(),
            ..Default::default()
        }))
    }

    fn extract_text(&self, _content: &[u8], max_chars: usize) -> CollaboratorResult<Option<String>> {
        if self.fail {
            return Err(CollaboratorError::other("extraction failed"));
        }
        Ok(Some("full text".chars().take(max_chars).collect()))
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    pub fail_cover_letter: bool,
    pub fail_filing_instructions: bool,
}

impl DocumentRenderer for FakeRenderer {
    fn generate_cover_letter(
        &self,
        case: &CaseData,
        _visa_type: &str,
        exhibits: &[Exhibit],
        destination: &Path,
    ) -> CollaboratorResult<Option<PathBuf>> {
        if self.fail_cover_letter {
            return Err(CollaboratorError::other("template missing"));
        }
        let body = format!("cover letter for {} ({} exhibits)", case.beneficiary_name, exhibits.len());
        write(destination, body.as_bytes())?;
        Ok(Some(destination.to_path_buf()))
    }

    fn generate_filing_instructions(
        &self,
        case: &CaseData,
        _visa_type: &str,
        _exhibits: &[Exhibit],
        destination: &Path,
    ) -> CollaboratorResult<Option<PathBuf>> {
        if self.fail_filing_instructions {
            return Err(CollaboratorError::other("template missing"));
        }
        write(destination, format!("filing for {}", case.petitioner_name).as_bytes())?;
        Ok(Some(destination.to_path_buf()))
    }
}

/// Fakes for every collaborator.
pub fn collaborators() -> Collaborators {
    Collaborators {
        pdf: Arc::new(FakePdf::default()),
        compressor: Arc::new(FakeCompressor::default()),
        labeler: Arc::new(FakeLabeler::default()),
        renderer: Arc::new(FakeRenderer::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_documents_report_pages() {
        assert_eq!(pages_of(&pdf_bytes(4)).unwrap(), 4);
        assert!(pages_of(b"nope").is_err());
    }
}
