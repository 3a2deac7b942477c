//! Page stamping: label every page of a rendered document `"{chapter}.{i}"`.
//!
//! The existing page content is wrapped in a `q … Q` pair so whatever
//! graphics state the renderer leaves behind cannot leak into the label,
//! then a small overlay stream draws the label centred half an inch above
//! the bottom edge of the page's media box.

use crate::error::PipelineError;
use crate::pipeline::pdf::{self, Canvas, StandardFont, INCH};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const LABEL_FONT: StandardFont = StandardFont::Helvetica;
const LABEL_SIZE: f32 = 9.0;
const LABEL_GREY: f32 = 0.3;

/// Stamp every page of `doc` in place. Returns the page count.
pub fn stamp_document(doc: &mut Document, chapter: u32) -> Result<usize, lopdf::Error> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Ok(0);
    }

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut font_ids: HashMap<StandardFont, ObjectId> = HashMap::new();

    for (index, &page_id) in page_ids.iter().enumerate() {
        let [x0, y0, x1, y1] = pdf::media_box(doc, page_id);
        let mut canvas = Canvas::new(x1 - x0, y1 - y0);
        canvas.set_fill_rgb(LABEL_GREY, LABEL_GREY, LABEL_GREY);
        canvas.draw_centred_string(
            LABEL_FONT,
            LABEL_SIZE,
            (x0 + x1) / 2.0,
            y0 + 0.5 * INCH,
            &format!("{chapter}.{}", index + 1),
        );

        for &font in canvas.fonts() {
            if !font_ids.contains_key(&font) {
                let id = doc.add_object(font.dictionary());
                font_ids.insert(font, id);
            }
        }
        let fonts: Vec<(StandardFont, ObjectId)> = canvas
            .fonts()
            .iter()
            .filter_map(|f| font_ids.get(f).map(|id| (*f, *id)))
            .collect();
        register_fonts(doc, page_id, &fonts)?;

        // leading newline: the page's last stream may end without whitespace
        let mut overlay = b"\nQ\n".to_vec();
        overlay.extend(canvas.encode()?);
        let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));
        wrap_contents(doc, page_id, save_id, overlay_id)?;
    }

    Ok(page_ids.len())
}

/// Stamp the PDF at `input` and write the result to `output`.
///
/// Returns the number of pages stamped; a zero-page input produces a
/// zero-page output.
pub fn stamp(input: &Path, output: &Path, chapter: u32) -> Result<usize, PipelineError> {
    let mut doc = pdf::load(input)?;
    let pages = stamp_document(&mut doc, chapter).map_err(|e| PipelineError::pdf(input, e))?;
    pdf::save(&mut doc, output)?;
    debug!("Stamped {} pages of {} as chapter {}", pages, input.display(), chapter);
    Ok(pages)
}

/// Give the page its own resource dictionary with the label fonts added.
///
/// Resources may be inline, a reference shared between pages, or inherited
/// from the page tree; in every case the page ends up with an inline copy so
/// other pages sharing the original are not affected.
fn register_fonts(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &[(StandardFont, ObjectId)],
) -> Result<(), lopdf::Error> {
    let mut resources = match pdf::inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        Some(Object::Reference(id)) => doc.get_object(id)?.as_dict()?.clone(),
        _ => Dictionary::new(),
    };

    let mut font_dict = match resources.get(b"Font") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc.get_object(*id)?.as_dict()?.clone(),
        _ => Dictionary::new(),
    };
    for (font, id) in fonts {
        font_dict.set(font.resource_name(), Object::Reference(*id));
    }
    resources.set("Font", Object::Dictionary(font_dict));

    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Replace the page's `Contents` with `[save, original…, overlay]`.
fn wrap_contents(
    doc: &mut Document,
    page_id: ObjectId,
    save_id: ObjectId,
    overlay_id: ObjectId,
) -> Result<(), lopdf::Error> {
    let existing: Vec<Object> = match doc.get_object(page_id)?.as_dict()?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(parts)) => parts.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(parts)) => parts.clone(),
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", Object::Array(contents));
    Ok(())
}
