//! Cover letter and filing instructions rendered as Markdown.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use super::{CollaboratorError, CollaboratorResult, DocumentRenderer};
use crate::models::{CaseData, Exhibit};

#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn write(destination: &Path, content: &str) -> CollaboratorResult<PathBuf> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CollaboratorError::io(format!("creating {}", parent.display()), e))?;
        }
        fs::write(destination, content)
            .map_err(|e| CollaboratorError::io(format!("writing {}", destination.display()), e))?;
        Ok(destination.to_path_buf())
    }
}

impl DocumentRenderer for MarkdownRenderer {
    fn generate_cover_letter(
        &self,
        case: &CaseData,
        visa_type: &str,
        exhibits: &[Exhibit],
        destination: &Path,
    ) -> CollaboratorResult<Option<PathBuf>> {
        let content = render_cover_letter(case, visa_type, exhibits);
        Self::write(destination, &content).map(Some)
    }

    fn generate_filing_instructions(
        &self,
        case: &CaseData,
        visa_type: &str,
        exhibits: &[Exhibit],
        destination: &Path,
    ) -> CollaboratorResult<Option<PathBuf>> {
        let content = render_filing_instructions(case, visa_type, exhibits);
        Self::write(destination, &content).map(Some)
    }
}

fn render_cover_letter(case: &CaseData, visa_type: &str, exhibits: &[Exhibit]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", Local::now().format("%B %-d, %Y"));
    let _ = writeln!(out, "U.S. Citizenship and Immigration Services");
    let _ = writeln!(out, "{}\n", case.service_center);
    let _ = writeln!(
        out,
        "**RE: {} Petition for {} on behalf of {}**\n",
        visa_type, case.beneficiary_name, case.petitioner_name
    );
    let _ = writeln!(out, "Dear Sir or Madam:\n");

    let mut intro = format!(
        "{} respectfully submits this {} petition on behalf of {}",
        case.petitioner_name, visa_type, case.beneficiary_name
    );
    if !case.nationality.is_empty() {
        let _ = write!(intro, ", a national of {}", case.nationality);
    }
    if !case.job_title.is_empty() {
        let _ = write!(intro, ", to work as {}", case.job_title);
    }
    if !case.field.is_empty() {
        let _ = write!(intro, " in the field of {}", case.field);
    }
    let _ = write!(intro, " for a period of {}.", case.duration);
    let _ = writeln!(out, "{}\n", intro);

    if !case.criteria_met.is_empty() {
        let _ = writeln!(
            out,
            "The enclosed evidence establishes that the beneficiary satisfies the following criteria:\n"
        );
        for criterion in &case.criteria_met {
            let _ = writeln!(out, "- {}", criterion);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Index of Exhibits\n");
    if exhibits.is_empty() {
        let _ = writeln!(out, "_No exhibits enclosed._\n");
    } else {
        let _ = writeln!(out, "| Exhibit | Description | Pages |");
        let _ = writeln!(out, "|---|---|---|");
        for exhibit in exhibits {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                exhibit.number,
                exhibit.title.replace('|', "/"),
                exhibit.pages
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "We respectfully request that this petition be approved.\n\nSincerely,\n\n{}",
        case.petitioner_name
    );
    out
}

fn render_filing_instructions(case: &CaseData, visa_type: &str, exhibits: &[Exhibit]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Filing Instructions: {} Petition\n", visa_type);
    let _ = writeln!(out, "- **Beneficiary:** {}", case.beneficiary_name);
    let _ = writeln!(out, "- **Petitioner:** {}", case.petitioner_name);
    let _ = writeln!(out, "- **Service center:** {}", case.service_center);
    let _ = writeln!(out, "- **Processing:** {}", case.processing_type);
    let _ = writeln!(out, "- **Filing fee:** {}", case.filing_fee);
    if case.processing_type.eq_ignore_ascii_case("premium") {
        let _ = writeln!(out, "- **Premium processing fee:** {}", case.premium_fee);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Checklist\n");
    let _ = writeln!(out, "1. Sign and date Form I-129 and the {} supplement.", visa_type);
    let _ = writeln!(
        out,
        "2. Include a check or Form G-1450 for {}.",
        case.filing_fee
    );
    if case.processing_type.eq_ignore_ascii_case("premium") {
        let _ = writeln!(
            out,
            "3. Add Form I-907 with a separate payment of {}.",
            case.premium_fee
        );
    }
    let _ = writeln!(
        out,
        "{}. Place the cover letter on top, followed by the forms and the exhibit package in order.",
        if case.processing_type.eq_ignore_ascii_case("premium") { 4 } else { 3 }
    );
    let _ = writeln!(out);

    if !case.criteria_met.is_empty() {
        let _ = writeln!(out, "## Criteria Claimed\n");
        for criterion in &case.criteria_met {
            let _ = writeln!(out, "- [ ] {}", criterion);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Exhibit Order\n");
    for exhibit in exhibits {
        let _ = writeln!(
            out,
            "- [ ] Exhibit {}: {} ({})",
            exhibit.number, exhibit.title, exhibit.filename
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exhibit(number: &str, title: &str) -> Exhibit {
        Exhibit {
            number: number.into(),
            title: title.into(),
            filename: format!("{}.pdf", title.to_lowercase()),
            pages: 2,
            compression: None,
            analysis: None,
        }
    }

    #[test]
    fn cover_letter_lists_exhibits_and_case() {
        let case = CaseData {
            beneficiary_name: "Ada Lovelace".into(),
            job_title: "Research Scientist".into(),
            criteria_met: vec!["Awards".into()],
            ..Default::default()
        };
        let text = render_cover_letter(&case, "O-1A", &[exhibit("A", "Passport")]);

        assert!(text.contains("O-1A Petition for Ada Lovelace"));
        assert!(text.contains("California Service Center"));
        assert!(text.contains("to work as Research Scientist"));
        assert!(text.contains("| A | Passport | 2 |"));
        assert!(text.contains("- Awards"));
    }

    #[test]
    fn filing_instructions_include_premium_only_when_requested() {
        let regular = render_filing_instructions(&CaseData::default(), "O-1A", &[]);
        assert!(!regular.contains("I-907"));
        assert!(regular.contains("$460"));

        let premium_case = CaseData {
            processing_type: "Premium".into(),
            ..Default::default()
        };
        let premium = render_filing_instructions(&premium_case, "O-1A", &[exhibit("A", "Cv")]);
        assert!(premium.contains("I-907"));
        assert!(premium.contains("$2,805"));
        assert!(premium.contains("Exhibit A: Cv (cv.pdf)"));
    }

    #[test]
    fn renderer_writes_to_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("docs").join("Cover_Letter.md");
        let written = MarkdownRenderer::new()
            .generate_cover_letter(&CaseData::default(), "O-1A", &[], &dest)
            .unwrap();
        assert_eq!(written.as_deref(), Some(dest.as_path()));
        assert!(fs::read_to_string(&dest).unwrap().contains("No exhibits enclosed"));
    }
}
