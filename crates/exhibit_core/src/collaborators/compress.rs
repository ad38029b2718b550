//! Lossless PDF compression with `lopdf`.

use std::fs;
use std::io::Write;
use std::path::Path;

use lopdf::Document;

use super::{CollaboratorError, CollaboratorResult, CompressionOutcome, Compressor};
use crate::models::{CompressionOptions, QualityPreset};

/// Recompresses streams and drops unused objects; never makes a file larger.
#[derive(Debug, Clone, Default)]
pub struct LocalCompressor;

impl LocalCompressor {
    pub fn new() -> Self {
        Self
    }

    fn method(quality: QualityPreset) -> String {
        format!("lopdf-{}", quality)
    }
}

impl Compressor for LocalCompressor {
    fn compress(
        &self,
        path: &Path,
        options: &CompressionOptions,
    ) -> CollaboratorResult<CompressionOutcome> {
        if options.api_key.is_some() {
            tracing::debug!("External compression key set; using local compression");
        }

        let original = fs::read(path)
            .map_err(|e| CollaboratorError::io(format!("reading {}", path.display()), e))?;
        let original_size = original.len() as u64;

        let mut doc = Document::load_mem(&original)?;
        match options.quality {
            QualityPreset::High => {}
            QualityPreset::Balanced => {
                doc.prune_objects();
            }
            QualityPreset::Maximum => {
                doc.prune_objects();
                doc.delete_zero_length_streams();
                doc.renumber_objects();
            }
        }
        doc.compress();

        let mut buffer = Vec::with_capacity(original.len());
        doc.save_to(&mut buffer)
            .map_err(|e| CollaboratorError::other(format!("serializing {}: {}", path.display(), e)))?;

        let method = Self::method(options.quality);
        if buffer.len() as u64 >= original_size {
            return Ok(CompressionOutcome::measured(
                original_size,
                original_size,
                format!("{} (unchanged)", method),
            ));
        }

        replace_file(path, &buffer)?;
        Ok(CompressionOutcome::measured(
            original_size,
            buffer.len() as u64,
            method,
        ))
    }
}

/// Write next to `path` then rename over it.
fn replace_file(path: &Path, content: &[u8]) -> CollaboratorResult<()> {
    let temp_path = path.with_extension("pdf.tmp");
    {
        let mut file = fs::File::create(&temp_path)
            .map_err(|e| CollaboratorError::io(format!("creating {}", temp_path.display()), e))?;
        file.write_all(content)
            .and_then(|_| file.sync_all())
            .map_err(|e| CollaboratorError::io(format!("writing {}", temp_path.display()), e))?;
    }
    fs::rename(&temp_path, path)
        .map_err(|e| CollaboratorError::io(format!("replacing {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::TextPdf;
    use tempfile::tempdir;

    #[test]
    fn compressed_file_is_never_larger() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        TextPdf::new()
            .paragraph("repeated text ".repeat(400))
            .save(&path)
            .unwrap();
        let before = fs::metadata(&path).unwrap().len();

        let options = CompressionOptions {
            quality: QualityPreset::Maximum,
            ..Default::default()
        };
        let outcome = LocalCompressor::new().compress(&path, &options).unwrap();

        let after = fs::metadata(&path).unwrap().len();
        assert!(outcome.success);
        assert_eq!(outcome.original_size, before);
        assert_eq!(outcome.compressed_size, after);
        assert!(after <= before);
        assert!(outcome.method.starts_with("lopdf-maximum"));
        assert!(outcome.reduction_percent >= 0.0);
    }

    #[test]
    fn non_pdf_input_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        fs::write(&path, b"plain text").unwrap();

        let result = LocalCompressor::new().compress(&path, &CompressionOptions::default());
        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), b"plain text");
    }
}
