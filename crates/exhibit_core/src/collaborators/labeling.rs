//! Keyword and pattern based document labeling.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use lopdf::Document;
use regex::Regex;

use super::{CollaboratorResult, DocumentLabeler};
use crate::models::ExhibitAnalysis;

/// (keywords, label) pairs; first match wins.
const CATEGORIES: &[(&[&str], &str)] = &[
    (&["passport"], "Passport"),
    (&["i-797", "approval notice"], "Approval Notice (I-797)"),
    (&["i-94", "arrival/departure"], "I-94 Record"),
    (
        &["recommendation", "letter of support", "support letter", "reference letter"],
        "Recommendation Letter",
    ),
    (&["curriculum vitae", "resume", "cv"], "Resume / CV"),
    (&["award", "prize", "honor", "medal"], "Award Certificate"),
    (&["diploma", "degree", "transcript"], "Educational Credentials"),
    (&["employment agreement", "offer letter", "contract"], "Employment Agreement"),
    (&["itinerary"], "Itinerary"),
    (&["salary", "pay stub", "payslip", "w-2", "compensation"], "Compensation Evidence"),
    (&["membership", "member of"], "Membership Evidence"),
    (&["judge", "reviewer", "peer review"], "Judging Evidence"),
    (&["journal", "publication", "published", "conference"], "Published Article"),
    (&["press", "article about", "media", "interview"], "Media Coverage"),
    (&["patent"], "Patent"),
];

static DATE_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}|\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2})\b",
    )
    .expect("valid date regex")
});

static FORM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(I-\d{2,3}[A-Z]?|G-\d{2,4}|DS-\d{3,4})\b").expect("valid form regex")
});

static VISA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(O-1A|O-1B|O-2|P-1A?|EB-1A|EB-1B|EB-2|H-1B|L-1A|L-1B)\b")
        .expect("valid visa regex")
});

static ENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:\s+(?:of\s+)?[A-Z][a-z]+){1,4})\b").expect("valid entity regex")
});

const SUMMARY_CHARS: usize = 240;
const MAX_ENTITIES: usize = 10;

/// Offline labeler: text comes from `lopdf`, labels from keyword tables.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedLabeler;

impl RuleBasedLabeler {
    pub fn new() -> Self {
        Self
    }

    /// Text of the document; unreadable PDFs yield an empty string.
    fn document_text(content: &[u8]) -> String {
        let Ok(doc) = Document::load_mem(content) else {
            return String::new();
        };
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        doc.extract_text(&pages).unwrap_or_default()
    }
}

impl DocumentLabeler for RuleBasedLabeler {
    fn generate_short_label(
        &self,
        content: &[u8],
        filename: &str,
        _visa_type: &str,
    ) -> CollaboratorResult<Option<String>> {
        let haystack = format!("{} {}", filename, Self::document_text(content));
        Ok(classify(&haystack).map(str::to_string))
    }

    fn analyze_pdf(
        &self,
        content: &[u8],
        filename: &str,
        visa_type: &str,
    ) -> CollaboratorResult<Option<ExhibitAnalysis>> {
        let text = Self::document_text(content);
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(analyze_text(&text, filename, visa_type)))
    }

    fn extract_text(&self, content: &[u8], max_chars: usize) -> CollaboratorResult<Option<String>> {
        let doc = Document::load_mem(content)?;
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        let text = doc.extract_text(&pages)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text.chars().take(max_chars).collect()))
    }
}

/// Label for the first category whose keyword appears in `text`.
fn classify(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let words: BTreeSet<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();

    CATEGORIES.iter().find_map(|(keywords, label)| {
        keywords
            .iter()
            .any(|k| {
                // Short keywords must match a whole word ("cv" in "cvs").
                if k.len() <= 3 {
                    words.contains(k)
                } else {
                    lower.contains(k)
                }
            })
            .then_some(*label)
    })
}

fn analyze_text(text: &str, filename: &str, visa_type: &str) -> ExhibitAnalysis {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let summary = summarize(&collapsed);
    let document_type = classify(&format!("{} {}", filename, collapsed))
        .unwrap_or("Supporting Document")
        .to_string();

    let dates = unique(DATE_PATTERNS.find_iter(&collapsed).map(|m| m.as_str()));
    let forms = unique(FORM_PATTERN.find_iter(&collapsed).map(|m| m.as_str()));
    let mut visa_mentions = unique(VISA_PATTERN.find_iter(&collapsed).map(|m| m.as_str()));
    if !visa_type.is_empty()
        && collapsed.contains(visa_type)
        && !visa_mentions.iter().any(|v| v == visa_type)
    {
        visa_mentions.push(visa_type.to_string());
    }
    let mut entities = unique(ENTITY_PATTERN.find_iter(&collapsed).map(|m| m.as_str()));
    entities.truncate(MAX_ENTITIES);

    ExhibitAnalysis {
        summary,
        document_type,
        dates,
        forms,
        visa_mentions,
        entities,
    }
}

/// First sentence, capped at a readable length on a word boundary.
fn summarize(text: &str) -> String {
    let sentence_end = text
        .char_indices()
        .find(|&(i, c)| matches!(c, '.' | '!' | '?') && i > 20)
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(text.len());
    let sentence = &text[..sentence_end];

    if sentence.chars().count() <= SUMMARY_CHARS {
        return sentence.trim().to_string();
    }
    let mut out = String::new();
    for word in sentence.split_whitespace() {
        if out.chars().count() + word.chars().count() + 1 > SUMMARY_CHARS {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out.push_str("...");
    out
}

fn unique<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .filter(|item| seen.insert(*item))
        .map(str::to_string)
        .collect()
}
