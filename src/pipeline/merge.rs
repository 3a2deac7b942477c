//! Page-order-preserving PDF concatenation.

use crate::error::PipelineError;
use crate::pipeline::pdf;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Object types rebuilt (or re-derived on save) rather than copied over.
const SKIPPED_TYPES: [&str; 7] = [
    "Catalog", "Pages", "Page", "Outlines", "Outline", "ObjStm", "XRef",
];

/// Concatenate `docs` into one document, pages in input order.
///
/// Inherited page attributes (resources, media box, crop box, rotation) are
/// copied onto each page before the source page trees are discarded, so
/// pages render the same after re-parenting.
pub fn merge_documents(docs: Vec<Document>) -> Result<Document, lopdf::Error> {
    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects = std::collections::BTreeMap::new();

    for mut doc in docs {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for page_id in doc.get_pages().into_values() {
            pages.push((page_id, pdf::flatten_inherited(&doc, page_id)?));
        }

        for (id, object) in doc.objects {
            let skip = object
                .type_name()
                .map(|t| SKIPPED_TYPES.contains(&t))
                .unwrap_or(false);
            if !skip {
                objects.insert(id, object);
            }
        }
    }

    let mut merged = Document::with_version("1.5");
    merged.objects = objects;
    merged.max_id = max_id;
    let pages_id = merged.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    for (id, mut page) in pages {
        page.set("Parent", Object::Reference(pages_id));
        merged.objects.insert(id, Object::Dictionary(page));
        kids.push(Object::Reference(id));
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );
    let catalog_id = merged.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    Ok(merged)
}

/// Load `inputs` in order, prepend `lead` if given, and write the
/// concatenation to `output`. Returns the page count of the result.
pub fn merge_files(
    lead: Option<Document>,
    inputs: &[PathBuf],
    output: &Path,
) -> Result<usize, PipelineError> {
    let mut docs = Vec::with_capacity(inputs.len() + 1);
    docs.extend(lead);
    for path in inputs {
        docs.push(pdf::load(path)?);
    }

    let mut merged = merge_documents(docs).map_err(|e| PipelineError::pdf(output, e))?;
    let pages = merged.get_pages().len();
    pdf::save(&mut merged, output)?;
    debug!("Merged {} inputs into {} ({} pages)", inputs.len(), output.display(), pages);
    Ok(pages)
}
