//! Extract step - materializes every input into the working directory.
//!
//! Uploaded files are written from their content; archive-extracted paths
//! are copied after checking that they still exist and lie under the
//! extraction root. An item that cannot be materialized is reported as a
//! warning and left out of the working set.
//!
//! When a reviewed exhibit order is present, the working set is sorted by
//! it afterwards. Files missing from the order keep input order after the
//! ordered ones.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{ExhibitOrder, StepName};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::AssemblyStep;
use crate::orchestrator::types::{Context, MaterializedFile, RunState, StepOutcome, StepProgress};

/// Subdirectory of the work dir holding materialized sources.
const SOURCES_DIR: &str = "sources";

pub struct ExtractStep;

impl ExtractStep {
    pub fn new() -> Self {
        Self
    }

    /// Validate an archive-extracted path against the extraction root.
    fn check_archive_path(&self, root: Option<&Path>, path: &Path) -> Result<PathBuf, String> {
        let root = root.ok_or_else(|| {
            format!(
                "{}: extraction root is not available",
                path.display()
            )
        })?;
        let resolved = fs::canonicalize(path)
            .map_err(|e| format!("{}: no longer available ({})", path.display(), e))?;
        if !resolved.starts_with(root) {
            return Err(format!(
                "{}: outside the extraction root",
                path.display()
            ));
        }
        if !resolved.is_file() {
            return Err(format!("{}: not a regular file", path.display()));
        }
        Ok(resolved)
    }
}

impl Default for ExtractStep {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyStep for ExtractStep {
    fn name(&self) -> StepName {
        StepName::Extract
    }

    fn execute(
        &self,
        ctx: &Context,
        run: &mut RunState,
        progress: &StepProgress,
    ) -> StepResult<StepOutcome> {
        let total = ctx.request.item_count();
        if total == 0 {
            progress.set(100.0)?;
            return Ok(StepOutcome::Skipped("no input files".to_string()));
        }

        let sources = ctx.work_path(SOURCES_DIR);
        fs::create_dir_all(&sources)
            .map_err(|e| StepError::io_error("creating working area", e))?;

        let mut done = 0;

        for upload in &ctx.request.uploads {
            match upload.read_bytes() {
                Ok(bytes) => {
                    let name = display_name(&upload.name);
                    let dest = unique_destination(&sources, &name);
                    fs::write(&dest, &bytes)
                        .map_err(|e| StepError::io_error(format!("writing {}", dest.display()), e))?;
                    progress.detail(&format!("materialized {} ({} bytes)", name, bytes.len()));
                    run.files.push(MaterializedFile {
                        name,
                        path: dest,
                        compression: None,
                    });
                }
                Err(e) => progress.warn(format!("{}: could not be read ({})", upload.name, e))?,
            }
            done += 1;
            progress.items(done, total)?;
        }

        // Canonical so symlinks and `..` cannot escape the root.
        let root = fs::canonicalize(ctx.extraction_root()).ok();

        for path in &ctx.request.archive_paths {
            match self.check_archive_path(root.as_deref(), path) {
                Ok(resolved) => {
                    let name = display_name(&resolved.to_string_lossy());
                    let dest = unique_destination(&sources, &name);
                    match fs::copy(&resolved, &dest) {
                        Ok(bytes) => {
                            progress.detail(&format!("copied {} ({} bytes)", name, bytes));
                            run.files.push(MaterializedFile {
                                name,
                                path: dest,
                                compression: None,
                            });
                        }
                        Err(e) => progress.warn(format!("{}: copy failed ({})", path.display(), e))?,
                    }
                }
                Err(reason) => progress.warn(reason)?,
            }
            done += 1;
            progress.items(done, total)?;
        }

        if let Some(order) = &ctx.request.ordering {
            apply_order(&mut run.files, order);
        }

        ctx.logger.info(&format!(
            "Materialized {} of {} input file(s)",
            run.files.len(),
            total
        ));
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, run: &RunState) -> StepResult<()> {
        if let Some(missing) = run.files.iter().find(|f| !f.path.is_file()) {
            return Err(StepError::invalid_output(format!(
                "materialized file missing: {}",
                missing.path.display()
            )));
        }
        Ok(())
    }
}

/// Stable sort by reviewed position; unlisted files go last in input order.
pub(crate) fn apply_order(files: &mut [MaterializedFile], order: &ExhibitOrder) {
    files.sort_by_key(|f| order.position(&f.name).unwrap_or(usize::MAX));
}

/// Final path component, so a crafted name cannot leave the sources dir.
fn display_name(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "document.pdf".to_string()
    } else {
        name.to_string()
    }
}

/// `dir/name`, or `dir/stem_N.ext` when that is taken.
fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (2..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{self, pdf_bytes};
    use crate::models::{AssemblyRequest, ExhibitOrderEntry, InputFile};
    use crate::orchestrator::testing::Fixture;

    fn names(run: &RunState) -> Vec<&str> {
        run.files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn materializes_uploads_in_input_order() {
        let request = AssemblyRequest::default()
            .with_upload(InputFile::from_bytes("b.pdf", pdf_bytes(1)))
            .with_upload(InputFile::from_bytes("a.pdf", pdf_bytes(2)));
        let fixture = Fixture::new(request, fakes::collaborators());
        let progress = fixture.progress(StepName::Extract);
        let mut run = RunState::new("run");

        let outcome = ExtractStep::new()
            .execute(&fixture.ctx, &mut run, &progress)
            .unwrap();

        assert_eq!(outcome, StepOutcome::Success);
        assert_eq!(names(&run), vec!["b.pdf", "a.pdf"]);
        assert!(run.files.iter().all(|f| f.path.starts_with(&fixture.ctx.work_dir)));
        assert_eq!(fs::read(&run.files[1].path).unwrap(), pdf_bytes(2));
    }

    #[test]
    fn rejects_archive_paths_outside_root_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("stray.pdf");
        fs::write(&outside, pdf_bytes(1)).unwrap();

        let mut fixture = Fixture::new(AssemblyRequest::default(), fakes::collaborators());
        let root = fixture.ctx.extraction_root().to_path_buf();
        fs::create_dir_all(&root).unwrap();
        let inside = root.join("inner.pdf");
        fs::write(&inside, pdf_bytes(3)).unwrap();

        fixture.ctx.request = AssemblyRequest::default()
            .with_archive_path(&inside)
            .with_archive_path(&outside)
            .with_archive_path(root.join("gone.pdf"));

        let progress = fixture.progress(StepName::Extract);
        let mut run = RunState::new("run");
        ExtractStep::new()
            .execute(&fixture.ctx, &mut run, &progress)
            .unwrap();

        assert_eq!(names(&run), vec!["inner.pdf"]);
        let warnings = fixture.warnings(StepName::Extract);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("outside the extraction root"));
        assert!(warnings[1].contains("no longer available"));
        assert_eq!(
            fixture.handle.snapshot().step(StepName::Extract).unwrap().progress(),
            100
        );
    }

    #[test]
    fn duplicate_names_get_distinct_files() {
        let request = AssemblyRequest::default()
            .with_upload(InputFile::from_bytes("cv.pdf", pdf_bytes(1)))
            .with_upload(InputFile::from_bytes("cv.pdf", pdf_bytes(2)));
        let fixture = Fixture::new(request, fakes::collaborators());
        let progress = fixture.progress(StepName::Extract);
        let mut run = RunState::new("run");

        ExtractStep::new()
            .execute(&fixture.ctx, &mut run, &progress)
            .unwrap();

        assert_eq!(run.files.len(), 2);
        assert_ne!(run.files[0].path, run.files[1].path);
        assert!(run.files[1].path.ends_with("cv_2.pdf"));
    }

    #[test]
    fn reviewed_order_is_applied() {
        let order = ExhibitOrder {
            entries: vec![
                ExhibitOrderEntry {
                    filename: "c.pdf".into(),
                    title: None,
                },
                ExhibitOrderEntry {
                    filename: "a.pdf".into(),
                    title: None,
                },
            ],
        };
        let request = AssemblyRequest::default()
            .with_upload(InputFile::from_bytes("a.pdf", pdf_bytes(1)))
            .with_upload(InputFile::from_bytes("b.pdf", pdf_bytes(1)))
            .with_upload(InputFile::from_bytes("c.pdf", pdf_bytes(1)))
            .with_ordering(order);
        let fixture = Fixture::new(request, fakes::collaborators());
        let progress = fixture.progress(StepName::Extract);
        let mut run = RunState::new("run");

        ExtractStep::new()
            .execute(&fixture.ctx, &mut run, &progress)
            .unwrap();

        assert_eq!(names(&run), vec!["c.pdf", "a.pdf", "b.pdf"]);
    }

    #[test]
    fn empty_request_is_skipped() {
        let fixture = Fixture::new(AssemblyRequest::default(), fakes::collaborators());
        let progress = fixture.progress(StepName::Extract);
        let mut run = RunState::new("run");

        let outcome = ExtractStep::new()
            .execute(&fixture.ctx, &mut run, &progress)
            .unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        assert!(run.files.is_empty());
    }

    #[test]
    fn display_name_strips_directories() {
        assert_eq!(display_name("../../etc/passwd"), "passwd");
        assert_eq!(display_name("dir\\file.pdf"), "file.pdf");
        assert_eq!(display_name(".."), "document.pdf");
    }
}
