use anyhow::{anyhow, Result};
use colored::*;
use lopdf::{Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::ranges::merged_file_name;
use crate::scanner::ExportedPdf;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

pub struct PdfMerger {
    documents: Vec<(String, Document)>,
}

impl PdfMerger {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
        }
    }

    pub async fn add_pdf(&mut self, path: &Path) -> Result<()> {
        let data = fs::read(path)
            .await
            .map_err(|e| anyhow!("Failed to read PDF file {}: {}", path.display(), e))?;

        let document = Document::load_mem(&data)
            .map_err(|e| anyhow!("Failed to parse PDF file {}: {}", path.display(), e))?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.pdf")
            .to_string();

        debug!("Loaded PDF with {} pages from {}", document.get_pages().len(), path.display());
        self.documents.push((filename, document));

        Ok(())
    }

    /// Write all added documents, in the order they were added, to `output_path`.
    /// Returns the number of pages written.
    pub async fn save(&self, output_path: &Path) -> Result<usize> {
        if self.documents.is_empty() {
            return Err(anyhow!("No PDFs added to merge"));
        }

        let mut merged_doc = if self.documents.len() == 1 {
            self.documents[0].1.clone()
        } else {
            self.concatenate()?
        };

        let page_count = merged_doc.get_pages().len();
        info!("Finalizing merged PDF with {} total pages", page_count);

        let mut data = Vec::new();
        merged_doc
            .save_to(&mut data)
            .map_err(|e| anyhow!("Failed to serialize merged PDF: {}", e))?;

        fs::write(output_path, data)
            .await
            .map_err(|e| anyhow!("Failed to write merged PDF to {}: {}", output_path.display(), e))?;

        info!(
            "Successfully merged {} PDFs into {}",
            self.documents.len(),
            output_path.display()
        );
        Ok(page_count)
    }

    fn concatenate(&self) -> Result<Document> {
        info!("Starting PDF merge process with {} documents", self.documents.len());

        // The first document's catalog and page tree root become the merged document's.
        let mut merged_doc = self.documents[0].1.clone();
        let pages_id = root_pages_id(&merged_doc)?;

        let mut all_page_ids = Vec::new();
        for (_, page_id) in merged_doc.get_pages() {
            inherit_page_attributes(&mut merged_doc, page_id);
            all_page_ids.push(page_id);
        }

        let mut max_id = merged_doc.max_id;

        for (i, (filename, document)) in self.documents.iter().enumerate().skip(1) {
            debug!(
                "Processing document {}: {} with {} pages",
                i + 1,
                filename,
                document.get_pages().len()
            );

            let mut doc_copy = document.clone();

            // Renumber objects to avoid conflicts
            doc_copy.renumber_objects_with(max_id + 1);
            max_id = doc_copy.max_id;

            for (_, page_id) in doc_copy.get_pages() {
                inherit_page_attributes(&mut doc_copy, page_id);
                all_page_ids.push(page_id);
            }

            merged_doc.objects.extend(doc_copy.objects);
        }

        info!("Total pages collected: {}", all_page_ids.len());

        for page_id in &all_page_ids {
            if let Ok(page) = merged_doc.get_dictionary_mut(*page_id) {
                page.set("Parent", Object::Reference(pages_id));
            }
        }

        let kids_len = all_page_ids.len();
        let pages_dict = merged_doc
            .get_dictionary_mut(pages_id)
            .map_err(|e| anyhow!("Merged document has no page tree: {}", e))?;
        pages_dict.set(
            "Kids",
            Object::Array(all_page_ids.into_iter().map(Object::Reference).collect()),
        );
        pages_dict.set("Count", Object::Integer(kids_len as i64));
        debug!("Updated Pages object with {} kids", kids_len);

        merged_doc.max_id = max_id;
        Ok(merged_doc)
    }
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn root_pages_id(document: &Document) -> Result<ObjectId> {
    document
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| anyhow!("PDF catalog has no Pages reference: {}", e))
}

/// Copy inherited attributes onto the page itself so it can be moved under a
/// different page tree node.
fn inherit_page_attributes(document: &mut Document, page_id: ObjectId) {
    let Ok(page) = document.get_dictionary(page_id) else {
        return;
    };

    let mut missing: Vec<&[u8]> = INHERITABLE.iter().copied().filter(|key| !page.has(key)).collect();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut inherited = Vec::new();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        if missing.is_empty() || depth > 64 {
            break;
        }
        let Ok(node) = document.get_dictionary(parent_id) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                inherited.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    if let Ok(page) = document.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
}

/// Merge exported PDFs, in the given order, into the merge folder under a name
/// built from their batch numbers.
///
/// Returns `Ok(None)` without touching the filesystem when there is nothing to
/// merge.
pub async fn merge_exports(exports: &[ExportedPdf], merge_folder: &Path) -> Result<Option<PathBuf>> {
    let numbers: Vec<i64> = exports.iter().map(|export| export.number).collect();
    let Some(file_name) = merged_file_name(&numbers) else {
        info!("No PDF files to merge");
        return Ok(None);
    };

    fs::create_dir_all(merge_folder)
        .await
        .map_err(|e| anyhow!("Failed to create merge folder {}: {}", merge_folder.display(), e))?;

    let output_path = merge_folder.join(file_name);

    let mut merger = PdfMerger::new();
    for export in exports {
        merger.add_pdf(&export.path).await?;
    }
    merger.save(&output_path).await?;

    info!("Merged PDF created: {}", output_path.display().to_string().green());
    Ok(Some(output_path))
}
