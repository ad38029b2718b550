//! Number step - turns each working file into an exhibit.
//!
//! For every file, in order:
//! - assign the display number for its position
//! - pick a title: reviewed title, then generated label, then file stem
//! - analyze the content and, if requested, extract its full text
//! - ask the PDF toolkit for a copy with a numbered cover page
//!
//! Labeling, analysis and text extraction are best effort. A failed rich
//! cover falls back to a cover carrying only the number; if that also
//! fails the run is aborted, since merge needs every numbered file.

use std::fs;
use std::path::Path;

use crate::collaborators::CoverContent;
use crate::models::{Exhibit, ExhibitAnalysis, FeatureOutcome, StepName};
use crate::numbering::exhibit_numbers;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::AssemblyStep;
use crate::orchestrator::types::{Context, MaterializedFile, RunState, StepOutcome, StepProgress};

/// Upper bound on extracted text appended after an exhibit.
pub const MAX_FULL_TEXT_CHARS: usize = 200_000;

pub struct NumberStep;

impl NumberStep {
    pub fn new() -> Self {
        Self
    }

    fn title_for(
        &self,
        ctx: &Context,
        file: &MaterializedFile,
        content: Option<&[u8]>,
        progress: &StepProgress,
    ) -> StepResult<String> {
        if let Some(title) = ctx
            .request
            .ordering
            .as_ref()
            .and_then(|o| o.title_for(&file.name))
        {
            return Ok(title.trim().to_string());
        }

        if let Some(content) = content {
            let label = FeatureOutcome::from_result(ctx.collaborators.labeler.generate_short_label(
                content,
                &file.name,
                ctx.visa_type(),
            ));
            if let Some(reason) = label.failure() {
                progress.warn(format!("{}: labeling failed ({})", file.name, reason))?;
            }
            if let Some(label) = label.produced().filter(|l| !l.trim().is_empty()) {
                return Ok(label.trim().to_string());
            }
        }

        Ok(file_stem(&file.name))
    }

    fn analyze(
        &self,
        ctx: &Context,
        file: &MaterializedFile,
        content: &[u8],
        progress: &StepProgress,
    ) -> StepResult<Option<ExhibitAnalysis>> {
        let analysis = FeatureOutcome::from_result(ctx.collaborators.labeler.analyze_pdf(
            content,
            &file.name,
            ctx.visa_type(),
        ));
        if let Some(reason) = analysis.failure() {
            progress.warn(format!("{}: analysis failed ({})", file.name, reason))?;
        }
        Ok(analysis.produced())
    }

    fn full_text(
        &self,
        ctx: &Context,
        file: &MaterializedFile,
        content: &[u8],
        progress: &StepProgress,
    ) -> StepResult<Option<String>> {
        let text = FeatureOutcome::from_result(
            ctx.collaborators
                .labeler
                .extract_text(content, MAX_FULL_TEXT_CHARS),
        );
        if let Some(reason) = text.failure() {
            progress.warn(format!("{}: text extraction failed ({})", file.name, reason))?;
        }
        Ok(text.produced().filter(|t| !t.trim().is_empty()))
    }
}

impl Default for NumberStep {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyStep for NumberStep {
    fn name(&self) -> StepName {
        StepName::Number
    }

    fn execute(
        &self,
        ctx: &Context,
        run: &mut RunState,
        progress: &StepProgress,
    ) -> StepResult<StepOutcome> {
        if run.files.is_empty() {
            return Ok(StepOutcome::Skipped("no files to number".to_string()));
        }

        let pdf = &ctx.collaborators.pdf;
        let numbers = exhibit_numbers(run.files.len(), ctx.options().numbering_style);
        let total = run.files.len();

        for (index, (file, number)) in run.files.iter().zip(numbers).enumerate() {
            let content = match fs::read(&file.path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    progress.warn(format!("{}: could not be read for labeling ({})", file.name, e))?;
                    None
                }
            };

            let title = self.title_for(ctx, file, content.as_deref(), progress)?;
            let analysis = match &content {
                Some(bytes) => self.analyze(ctx, file, bytes, progress)?,
                None => None,
            };
            let full_text = match &content {
                Some(bytes) if ctx.options().include_full_text_and_images => {
                    self.full_text(ctx, file, bytes, progress)?
                }
                _ => None,
            };

            let pages = match pdf.page_count(&file.path) {
                Ok(pages) => pages,
                Err(e) => {
                    progress.warn(format!("{}: page count unavailable ({})", file.name, e))?;
                    0
                }
            };

            let summary = analysis
                .as_ref()
                .map(|a| a.summary.as_str())
                .filter(|s| !s.is_empty());
            let cover = CoverContent {
                title: Some(title.as_str()),
                summary,
                extracted_text: full_text.as_deref(),
                content_bytes: content.as_deref(),
            };

            let numbered = match pdf.add_exhibit_number_with_cover(&file.path, &number, &cover) {
                Ok(path) => path,
                Err(e) => {
                    progress.warn(format!(
                        "{}: cover page failed, using number only ({})",
                        file.name, e
                    ))?;
                    pdf.add_exhibit_number_with_cover(&file.path, &number, &CoverContent::number_only())
                        .map_err(|e| {
                            StepError::collaborator(format!("Numbering exhibit {} ({})", number, file.name), e)
                        })?
                }
            };

            ctx.logger
                .info(&format!("Exhibit {}: {} ({} pages)", number, title, pages));
            run.exhibits.push(Exhibit {
                number,
                title,
                filename: file.name.clone(),
                pages,
                compression: file.compression.clone(),
                analysis,
            });
            run.numbered_files.push(numbered);
            progress.items(index + 1, total)?;
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, run: &RunState) -> StepResult<()> {
        if run.exhibits.len() != run.files.len() || run.numbered_files.len() != run.files.len() {
            return Err(StepError::invalid_output(format!(
                "{} file(s) but {} exhibit(s) and {} numbered file(s)",
                run.files.len(),
                run.exhibits.len(),
                run.numbered_files.len()
            )));
        }
        if let Some(missing) = run.numbered_files.iter().find(|p| !p.is_file()) {
            return Err(StepError::invalid_output(format!(
                "numbered file missing: {}",
                missing.display()
            )));
        }
        Ok(())
    }
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| name.to_string())
}
