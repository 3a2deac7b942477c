//! Shared PDF plumbing on top of `lopdf`.
//!
//! ## Coordinate system
//!
//! PDF uses a bottom-left origin: (0, 0) is the bottom-left corner of the
//! page, X grows to the right and Y grows upward. All positions passed to
//! [`Canvas`] are in points (1/72 inch) in that system.
//!
//! ## Fonts
//!
//! Covers and page labels only need the standard-14 Helvetica faces, which
//! every PDF reader ships. They are referenced (not embedded) with
//! `WinAnsiEncoding`, so text is transcoded with [`encode_win_ansi`] and
//! measured with the AFM advance widths below to centre strings.

use crate::error::PipelineError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

/// One inch in points.
pub const INCH: f32 = 72.0;

/// US Letter, portrait.
pub const LETTER: (f32, f32) = (612.0, 792.0);

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Depth limit when walking up the page tree; guards against cyclic parents.
const MAX_TREE_DEPTH: usize = 32;

// ── Fonts ────────────────────────────────────────────────────────────────

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for bytes outside the ASCII table.
const FALLBACK_WIDTH: u16 = 556;

/// A standard-14 font face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name; prefixed so it cannot clash with a renderer's own fonts.
    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "CpHelv",
            StandardFont::HelveticaBold => "CpHelvBold",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Rendered width of `text` at `size` points.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let widths = self.widths();
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|b| match b {
                32..=126 => u32::from(widths[usize::from(b - 32)]),
                _ => u32::from(FALLBACK_WIDTH),
            })
            .sum();
        units as f32 * size / 1000.0
    }

    /// Font dictionary referencing the face without embedding it.
    pub(crate) fn dictionary(self) -> Dictionary {
        Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(self.base_font().as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ])
    }
}

/// Transcode to WinAnsi bytes. Characters with no WinAnsi code become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}

// ── Canvas ───────────────────────────────────────────────────────────────

/// A minimal drawing surface that records content-stream operations.
///
/// Mirrors the handful of primitives the covers and page labels need:
/// fill colour, filled rectangles and centred strings.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: f32,
    height: f32,
    operations: Vec<Operation>,
    fonts: Vec<StandardFont>,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            operations: Vec::new(),
            fonts: Vec::new(),
        }
    }

    /// Set the non-stroking (fill) colour; components are 0.0–1.0.
    pub fn set_fill_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.operations.push(Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ));
    }

    /// Fill an axis-aligned rectangle with the current fill colour.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.operations.push(Operation::new(
            "re",
            vec![Object::Real(x), Object::Real(y), Object::Real(w), Object::Real(h)],
        ));
        self.operations.push(Operation::new("f", vec![]));
    }

    /// Draw `text` with its horizontal centre at `x_centre` and baseline at `y`.
    pub fn draw_centred_string(
        &mut self,
        font: StandardFont,
        size: f32,
        x_centre: f32,
        y: f32,
        text: &str,
    ) {
        if !self.fonts.contains(&font) {
            self.fonts.push(font);
        }
        let x = x_centre - font.text_width(text, size) / 2.0;
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font.resource_name().as_bytes().to_vec()),
                    Object::Real(size),
                ],
            ),
            Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Fonts referenced by the recorded operations.
    pub(crate) fn fonts(&self) -> &[StandardFont] {
        &self.fonts
    }

    /// Encode the recorded operations as a content stream body.
    pub(crate) fn encode(self) -> Result<Vec<u8>, lopdf::Error> {
        Content {
            operations: self.operations,
        }
        .encode()
    }

    /// Turn the canvas into a standalone single-page document.
    pub fn into_document(self) -> Result<Document, lopdf::Error> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font_refs = Dictionary::new();
        for font in &self.fonts {
            let id = doc.add_object(font.dictionary());
            font_refs.set(font.resource_name(), Object::Reference(id));
        }
        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(font_refs),
        )]));

        let (width, height) = (self.width, self.height);
        let content = self.encode()?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
        ]));

        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Ok(doc)
    }
}

// ── Page tree helpers ────────────────────────────────────────────────────

/// Resolve an inheritable page attribute, walking up `Parent` links.
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

/// Copy inherited attributes onto the page itself so it survives being
/// re-parented into a different page tree.
pub(crate) fn flatten_inherited(doc: &Document, page_id: ObjectId) -> Result<Dictionary, lopdf::Error> {
    let mut page = doc.get_object(page_id)?.as_dict()?.clone();
    for key in INHERITABLE {
        if !page.has(key) {
            if let Some(value) = inherited_attribute(doc, page_id, key) {
                page.set(key.to_vec(), value);
            }
        }
    }
    Ok(page)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Media box of a page as `[x0, y0, x1, y1]`, defaulting to US Letter.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let fallback = [0.0, 0.0, LETTER.0, LETTER.1];
    let array = match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(Object::Array(arr)) => arr,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => return fallback,
        },
        _ => return fallback,
    };
    let values: Vec<f32> = array.iter().filter_map(number).collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => [*x0, *y0, *x1, *y1],
        _ => fallback,
    }
}

// ── File helpers ─────────────────────────────────────────────────────────

/// Load a PDF from disk.
pub fn load(path: &Path) -> Result<Document, PipelineError> {
    Document::load(path).map_err(|e| PipelineError::pdf(path, e))
}

/// Serialise `doc` to `path`, creating parent directories as needed.
pub fn save(doc: &mut Document, path: &Path) -> Result<(), PipelineError> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PipelineError::pdf(path, e))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, bytes).map_err(|e| PipelineError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Run CPU-bound PDF work off the async worker threads.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, PipelineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PipelineError::Internal(format!("PDF task panicked: {}", e)))?
}

/// Number of pages in the PDF at `path`.
pub fn page_count(path: &Path) -> Result<usize, PipelineError> {
    Ok(load(path)?.get_pages().len())
}

/// Text shown by each `Tj` operator on a page, in content order.
pub fn page_strings(doc: &Document, page_number: u32) -> Vec<String> {
    let Some(page_id) = doc.get_pages().get(&page_number).copied() else {
        return Vec::new();
    };
    let Ok(bytes) = doc.get_page_content(page_id) else {
        return Vec::new();
    };
    let Ok(content) = Content::decode(&bytes) else {
        return Vec::new();
    };
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(bytes.iter().map(|&b| b as char).collect()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixture PDFs shared by the stamp, merge and chapter tests.

    use super::*;

    /// A `pages`-page US Letter document; page N shows the text "page N".
    /// Pages inherit their resources and media box from the page tree root,
    /// as many real-world producers arrange them.
    pub fn sample_document(pages: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Times-Roman".to_vec())),
        ]));
        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
        )]));

        let mut kids = Vec::with_capacity(pages);
        for n in 1..=pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                    Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
                    Operation::new("Tj", vec![Object::string_literal(format!("page {n}"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                content.encode().unwrap_or_default(),
            ));
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Count", Object::Integer(pages as i64)),
                ("Kids", Object::Array(kids)),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
                ),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    /// Write [`sample_document`] to `path`.
    pub fn write_sample(path: &Path, pages: usize) {
        let mut doc = sample_document(pages);
        save(&mut doc, path).unwrap();
    }
}
