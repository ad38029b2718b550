//! PDF operations backed by `lopdf`.
//!
//! Cover pages, the table of contents and full-text appendices are plain
//! text pages built with [`TextPdf`]; merging copies page trees into one
//! document.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::{CollaboratorError, CollaboratorResult, CoverContent, PdfToolkit};
use crate::models::Exhibit;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;
const WRAP_COLUMNS: usize = 90;

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

#[derive(Debug, Clone)]
enum Block {
    Line { text: String, size: i64, bold: bool },
    Space(i64),
    PageBreak,
}

/// Builder for simple text-only PDF documents.
#[derive(Debug, Clone, Default)]
pub struct TextPdf {
    blocks: Vec<Block>,
}

impl TextPdf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(mut self, text: impl AsRef<str>) -> Self {
        self.blocks.push(Block::Line {
            text: sanitize(text.as_ref()),
            size: 20,
            bold: true,
        });
        self
    }

    pub fn subheading(mut self, text: impl AsRef<str>) -> Self {
        self.blocks.push(Block::Line {
            text: sanitize(text.as_ref()),
            size: 14,
            bold: true,
        });
        self
    }

    pub fn line(mut self, text: impl AsRef<str>) -> Self {
        self.blocks.push(Block::Line {
            text: sanitize(text.as_ref()),
            size: 11,
            bold: false,
        });
        self
    }

    /// Word-wrapped body text; blank lines in `text` are kept.
    pub fn paragraph(mut self, text: impl AsRef<str>) -> Self {
        for raw in text.as_ref().lines() {
            if raw.trim().is_empty() {
                self.blocks.push(Block::Space(8));
                continue;
            }
            for wrapped in wrap(raw, WRAP_COLUMNS) {
                self = self.line(wrapped);
            }
        }
        self
    }

    pub fn space(mut self, points: i64) -> Self {
        self.blocks.push(Block::Space(points));
        self
    }

    pub fn page_break(mut self) -> Self {
        self.blocks.push(Block::PageBreak);
        self
    }

    /// Lay out the blocks into a standalone document.
    pub fn build(&self) -> CollaboratorResult<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => bold,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for operations in self.layout() {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let media_box: Vec<Object> = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ];
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => media_box,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Ok(doc)
    }

    /// Build and write to `path`.
    pub fn save(&self, path: &Path) -> CollaboratorResult<()> {
        let mut doc = self.build()?;
        save_document(&mut doc, path)
    }

    fn layout(&self) -> Vec<Vec<Operation>> {
        let mut pages = Vec::new();
        let mut current = Vec::new();
        let mut y = PAGE_HEIGHT - MARGIN;

        for block in &self.blocks {
            match block {
                Block::PageBreak => {
                    pages.push(std::mem::take(&mut current));
                    y = PAGE_HEIGHT - MARGIN;
                }
                Block::Space(points) => y -= points,
                Block::Line { text, size, bold } => {
                    let advance = size + 5;
                    if y - advance < MARGIN {
                        pages.push(std::mem::take(&mut current));
                        y = PAGE_HEIGHT - MARGIN;
                    }
                    y -= advance;
                    let font = if *bold { "F2" } else { "F1" };
                    current.push(Operation::new("BT", vec![]));
                    current.push(Operation::new("Tf", vec![font.into(), (*size).into()]));
                    current.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
                    current.push(Operation::new(
                        "Tj",
                        vec![Object::string_literal(text.as_str())],
                    ));
                    current.push(Operation::new("ET", vec![]));
                }
            }
        }

        if !current.is_empty() || pages.is_empty() {
            pages.push(current);
        }
        pages
    }
}

/// Default page toolkit.
#[derive(Debug, Clone, Default)]
pub struct LopdfToolkit;

impl LopdfToolkit {
    pub fn new() -> Self {
        Self
    }

    fn load(path: &Path) -> CollaboratorResult<Document> {
        Document::load(path).map_err(CollaboratorError::from)
    }
}

impl PdfToolkit for LopdfToolkit {
    fn page_count(&self, path: &Path) -> CollaboratorResult<u32> {
        Ok(Self::load(path)?.get_pages().len() as u32)
    }

    fn add_exhibit_number_with_cover(
        &self,
        path: &Path,
        number: &str,
        cover: &CoverContent<'_>,
    ) -> CollaboratorResult<PathBuf> {
        let source = match cover.content_bytes {
            Some(bytes) => Document::load_mem(bytes)?,
            None => Self::load(path)?,
        };

        let mut page = TextPdf::new()
            .space(180)
            .heading(format!("EXHIBIT {}", number));
        if let Some(title) = cover.title.filter(|t| !t.trim().is_empty()) {
            page = page.space(12).subheading(title);
        }
        if let Some(summary) = cover.summary.filter(|s| !s.trim().is_empty()) {
            page = page.space(24).paragraph(summary);
        }

        let mut documents = vec![page.build()?, source];
        if let Some(text) = cover.extracted_text.filter(|t| !t.trim().is_empty()) {
            let appendix = TextPdf::new()
                .subheading(format!("Exhibit {} - extracted text", number))
                .space(8)
                .paragraph(text);
            documents.push(appendix.build()?);
        }

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let destination = parent
            .join("numbered")
            .join(format!("Exhibit_{}.pdf", file_safe(number)));
        let mut merged = merge_documents(documents)?;
        save_document(&mut merged, &destination)?;
        Ok(destination)
    }

    fn generate_table_of_contents(
        &self,
        exhibits: &[Exhibit],
        visa_type: &str,
        destination: &Path,
    ) -> CollaboratorResult<PathBuf> {
        let mut toc = TextPdf::new()
            .heading("TABLE OF CONTENTS")
            .space(6)
            .line(format!("{} Petition - Supporting Exhibits", visa_type))
            .space(18);

        for exhibit in exhibits {
            let pages = if exhibit.pages == 1 { "page" } else { "pages" };
            toc = toc.line(format!(
                "Exhibit {}: {} ({} {})",
                exhibit.number, exhibit.title, exhibit.pages, pages
            ));
            if let Some(summary) = exhibit.summary() {
                for wrapped in wrap(summary, WRAP_COLUMNS - 6) {
                    toc = toc.line(format!("      {}", wrapped));
                }
            }
            toc = toc.space(4);
        }

        toc.save(destination)?;
        Ok(destination.to_path_buf())
    }

    fn merge(&self, paths: &[PathBuf], destination: &Path) -> CollaboratorResult<PathBuf> {
        let documents = paths
            .iter()
            .map(|p| Self::load(p))
            .collect::<CollaboratorResult<Vec<_>>>()?;
        let mut merged = merge_documents(documents)?;
        save_document(&mut merged, destination)?;
        Ok(destination.to_path_buf())
    }
}

/// Concatenate the page trees of `documents` in order.
fn merge_documents(documents: Vec<Document>) -> CollaboratorResult<Document> {
    if documents.is_empty() {
        return Err(CollaboratorError::unsupported("no documents to merge"));
    }

    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let mut page = doc.get_dictionary(page_id)?.clone();
            for key in INHERITABLE {
                if !page.has(key) {
                    if let Some(value) = inherited(&doc, &page, key) {
                        page.set(key.to_vec(), value);
                    }
                }
            }
            pages.push((page_id, page));
        }
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Dictionary)> = None;
    let mut pages_root: Option<ObjectId> = None;

    for (id, object) in objects {
        let kind = dict_type(&object).map(|k| k.to_vec());
        match kind.as_deref() {
            Some(b"Catalog") => {
                if catalog.is_none() {
                    if let Ok(dict) = object.as_dict() {
                        catalog = Some((id, dict.clone()));
                    }
                }
            }
            Some(b"Pages") => {
                if pages_root.is_none() {
                    pages_root = Some(id);
                }
            }
            Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                merged.objects.insert(id, object);
            }
        }
    }

    let (catalog_id, mut catalog_dict) =
        catalog.ok_or_else(|| CollaboratorError::other("merged input has no catalog"))?;
    let pages_id =
        pages_root.ok_or_else(|| CollaboratorError::other("merged input has no page tree"))?;

    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let count = pages.len() as i64;
    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(id, Object::Dictionary(page));
    }
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    catalog_dict.set("Pages", pages_id);
    catalog_dict.remove(b"Outlines");
    merged
        .objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));
    merged.trailer.set("Root", catalog_id);

    merged.max_id = merged.objects.keys().map(|(n, _)| *n).max().unwrap_or(0);
    merged.renumber_objects();
    merged.compress();
    Ok(merged)
}

fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Guard against cyclic page trees.
    for _ in 0..32 {
        let dict = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn dict_type(object: &Object) -> Option<&[u8]> {
    object.as_dict().ok()?.get(b"Type").ok()?.as_name().ok()
}

fn save_document(doc: &mut Document, path: &Path) -> CollaboratorResult<()> {
    ensure_parent(path)?;
    doc.save(path)
        .map(|_| ())
        .map_err(|e| CollaboratorError::other(format!("writing {}: {}", path.display(), e)))
}

fn ensure_parent(path: &Path) -> CollaboratorResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| CollaboratorError::io(format!("creating {}", parent.display()), e))?;
    }
    Ok(())
}

/// Standard 14 fonts only cover Latin-1; keep printable ASCII.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' => ' ',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
