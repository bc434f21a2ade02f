//! Thin wrapper over `lopdf::Document`.
//!
//! Every page tool ends in the same shape: pick a list of source pages (in
//! order, possibly repeated), build a document containing exactly those
//! pages, serialise it. [`PdfDocument::assemble`] is that single primitive.
//!
//! Pages in a PDF inherit `Resources`, `MediaBox`, `CropBox` and `Rotate`
//! from ancestors in the page tree. Before a page is moved into a new,
//! flat page tree those attributes are copied onto the page itself, so
//! nothing is lost when the old intermediate nodes are pruned.

use crate::error::AxevoraError;
use crate::input::SelectedFile;
use lopdf::encryption::decrypt_object;
use lopdf::xref::XrefEntry;
use lopdf::{Dictionary, Document, EncryptionState, Object, ObjectId, ObjectStream, Reader};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

/// Attributes a page may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A4 in PDF points, used when a page has no MediaBox anywhere in its tree.
pub(crate) const A4_POINTS: (f64, f64) = (595.0, 842.0);

/// Guards against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// Document-level facts shown by `pdf info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfInfo {
    pub file_name: String,
    pub page_count: usize,
    pub pdf_version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// Whether the file on disk was encrypted.
    pub was_encrypted: bool,
    /// `(width, height)` of each page in points.
    pub page_sizes: Vec<(f64, f64)>,
}

/// A loaded PDF with its page count read once at load time.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    name: String,
    doc: Document,
    page_count: usize,
    was_encrypted: bool,
}

impl PdfDocument {
    /// Parse a selected file, decrypting it with `password` when needed.
    pub fn load(file: &SelectedFile, password: Option<&str>) -> Result<Self, AxevoraError> {
        file.require_pdf()?;
        Self::load_bytes(&file.name, &file.bytes, password)
    }

    /// Parse raw bytes. `name` is only used in messages.
    ///
    /// lopdf opens encrypted files with the empty user password only; when
    /// that fails the object table comes back empty and the objects are
    /// re-read here with `password`.
    pub fn load_bytes(
        name: &str,
        bytes: &[u8],
        password: Option<&str>,
    ) -> Result<Self, AxevoraError> {
        let mut doc = Document::load_mem(bytes).map_err(|e| AxevoraError::CorruptPdf {
            name: name.to_string(),
            detail: e.to_string(),
        })?;

        let was_encrypted = doc.is_encrypted();
        if was_encrypted {
            if doc.encryption_state.is_none() {
                let Some(password) = password.filter(|p| !p.is_empty()) else {
                    return Err(AxevoraError::PasswordRequired {
                        name: name.to_string(),
                    });
                };
                decrypt_objects(&mut doc, name, bytes, password)?;
            }
            strip_encryption(&mut doc);
        }

        let page_count = doc.get_pages().len();
        debug!("Loaded '{}': {} pages, encrypted={}", name, page_count, was_encrypted);
        Ok(Self {
            name: name.to_string(),
            doc,
            page_count,
            was_encrypted,
        })
    }

    /// Wrap an already-built lopdf document.
    pub fn from_lopdf(name: impl Into<String>, doc: Document) -> Self {
        let page_count = doc.get_pages().len();
        Self {
            name: name.into(),
            doc,
            page_count,
            was_encrypted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Page count as read when the document was loaded.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn was_encrypted(&self) -> bool {
        self.was_encrypted
    }

    pub(crate) fn lopdf(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn lopdf_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Object ids of the pages in document order.
    fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    /// `(width, height)` of every page in points, honouring inherited MediaBox.
    pub fn page_sizes(&self) -> Vec<(f64, f64)> {
        self.page_ids()
            .into_iter()
            .map(|id| {
                self.doc
                    .get_dictionary(id)
                    .ok()
                    .and_then(|page| lookup_inherited(&self.doc, page, b"MediaBox"))
                    .and_then(|mb| media_box_size(&mb))
                    .unwrap_or(A4_POINTS)
            })
            .collect()
    }

    /// Document information dictionary plus page facts.
    pub fn info(&self) -> PdfInfo {
        let info_dict: Option<&Dictionary> = match self.doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => self.doc.get_dictionary(*id).ok(),
            Ok(Object::Dictionary(d)) => Some(d),
            _ => None,
        };
        let field = |key: &[u8]| -> Option<String> {
            info_dict
                .and_then(|d| d.get(key).ok())
                .and_then(text_string)
                .filter(|s| !s.trim().is_empty())
        };

        PdfInfo {
            file_name: self.name.clone(),
            page_count: self.page_count,
            pdf_version: self.doc.version.clone(),
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
            was_encrypted: self.was_encrypted,
            page_sizes: self.page_sizes(),
        }
    }

    /// Build a new document containing the given 0-indexed pages in order.
    ///
    /// Repeated indices produce independent copies of the page.
    pub fn assemble(&self, order: &[usize]) -> Result<PdfDocument, AxevoraError> {
        let pages = materialised_pages(&self.doc)?;
        let mut selected = Vec::with_capacity(order.len());
        for &idx in order {
            let page = pages.get(idx).ok_or(AxevoraError::PageOutOfRange {
                page: idx + 1,
                total: pages.len(),
            })?;
            selected.push(page.clone());
        }

        let mut doc = self.doc.clone();
        install_page_tree(&mut doc, selected)?;
        Ok(PdfDocument::from_lopdf(self.name.clone(), doc))
    }

    /// Add `degrees` to the rotation of the given 0-indexed pages.
    ///
    /// `degrees` must be a multiple of 90; the stored value is normalised to
    /// `0..360`.
    pub fn rotate(&mut self, pages: &[usize], degrees: i32) -> Result<(), AxevoraError> {
        if degrees % 90 != 0 {
            return Err(AxevoraError::InvalidRotation { degrees });
        }
        let ids = self.page_ids();
        for &idx in pages {
            let id = *ids.get(idx).ok_or(AxevoraError::PageOutOfRange {
                page: idx + 1,
                total: ids.len(),
            })?;
            let existing = self
                .doc
                .get_dictionary(id)
                .ok()
                .and_then(|page| lookup_inherited(&self.doc, page, b"Rotate"))
                .and_then(|r| r.as_i64().ok())
                .unwrap_or(0);
            let rotation = (existing + i64::from(degrees)).rem_euclid(360);
            let page = self
                .doc
                .get_dictionary_mut(id)
                .map_err(|e| AxevoraError::PdfWriteFailed(format!("page {}: {e}", idx + 1)))?;
            page.set("Rotate", Object::Integer(rotation));
            debug!("Page {} rotation {} → {}", idx + 1, existing, rotation);
        }
        Ok(())
    }

    /// Concatenate documents in order into one.
    pub fn merge(docs: Vec<PdfDocument>) -> Result<PdfDocument, AxevoraError> {
        let mut iter = docs.into_iter();
        let Some(first) = iter.next() else {
            return Err(AxevoraError::NotEnoughFiles {
                operation: "merge".into(),
                needed: 1,
                got: 0,
            });
        };

        let name = first.name;
        let mut base = first.doc;
        let mut pages = materialised_pages(&base)?;

        for other in iter {
            let mut doc = other.doc;
            doc.renumber_objects_with(base.max_id + 1);
            pages.extend(materialised_pages(&doc)?);
            base.max_id = base.max_id.max(doc.max_id);
            for (id, object) in doc.objects {
                base.objects.entry(id).or_insert(object);
            }
        }

        install_page_tree(&mut base, pages)?;
        Ok(PdfDocument::from_lopdf(name, base))
    }

    /// Plain text of one 0-indexed page.
    pub fn page_text(&self, idx: usize) -> Result<String, AxevoraError> {
        let page_number = u32::try_from(idx + 1).map_err(|e| AxevoraError::Internal(e.to_string()))?;
        self.doc
            .extract_text(&[page_number])
            .map_err(|e| AxevoraError::CorruptPdf {
                name: self.name.clone(),
                detail: format!("text of page {page_number}: {e}"),
            })
    }

    /// Serialise the document.
    pub fn to_bytes(mut self) -> Result<Vec<u8>, AxevoraError> {
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| AxevoraError::PdfWriteFailed(e.to_string()))?;
        Ok(out)
    }
}

/// Read every object of an encrypted file from `bytes` and decrypt it with
/// `password`, filling `doc.objects`.
fn decrypt_objects(
    doc: &mut Document,
    name: &str,
    bytes: &[u8],
    password: &str,
) -> Result<(), AxevoraError> {
    let wrong_password = || AxevoraError::WrongPassword {
        name: name.to_string(),
    };
    doc.authenticate_password(password)
        .map_err(|_| wrong_password())?;
    let state = EncryptionState::decode(&*doc, password).map_err(|_| wrong_password())?;
    let encrypt_id = doc.trailer.get(b"Encrypt").and_then(Object::as_reference).ok();

    // Xref offsets count from the header, like lopdf's own reader.
    let start = bytes.windows(5).position(|w| w == b"%PDF-").unwrap_or(0);
    let mut table = Document::new();
    table.reference_table = doc.reference_table.clone();
    let reader = Reader {
        buffer: &bytes[start..],
        document: table,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };

    let mut containers = BTreeSet::new();
    for (&number, entry) in &doc.reference_table.entries {
        match *entry {
            XrefEntry::Normal { generation, .. } => {
                let id = (number, generation);
                if Some(id) == encrypt_id {
                    continue;
                }
                let mut object = match reader.get_object(id, &mut HashSet::new()) {
                    Ok(object) => object,
                    Err(e) => {
                        warn!("'{}': skipping object {} {}: {}", name, id.0, id.1, e);
                        continue;
                    }
                };
                decrypt_object(&state, id, &mut object).map_err(|e| AxevoraError::CorruptPdf {
                    name: name.to_string(),
                    detail: format!("object {} {}: {e}", id.0, id.1),
                })?;
                doc.objects.insert(id, object);
            }
            XrefEntry::Compressed { container, .. } => {
                containers.insert(container);
            }
            XrefEntry::Free | XrefEntry::UnusableFree => {}
        }
    }

    for container in containers {
        let Some(Object::Stream(stream)) = doc.objects.get(&(container, 0)) else {
            continue;
        };
        let mut stream = stream.clone();
        match ObjectStream::new(&mut stream) {
            Ok(packed) => {
                for (id, object) in packed.objects {
                    doc.objects.entry(id).or_insert(object);
                }
            }
            Err(e) => warn!("'{}': unreadable object stream {}: {}", name, container, e),
        }
    }
    Ok(())
}

/// Drop the `/Encrypt` dictionary so the document saves in the clear.
fn strip_encryption(doc: &mut Document) {
    if let Ok(id) = doc.trailer.get(b"Encrypt").and_then(Object::as_reference) {
        doc.objects.remove(&id);
    }
    doc.trailer.remove(b"Encrypt");
    doc.encryption_state = None;
}

/// Clone every page dictionary with inherited attributes copied in.
fn materialised_pages(doc: &Document) -> Result<Vec<Dictionary>, AxevoraError> {
    doc.get_pages()
        .into_iter()
        .map(|(number, id)| {
            let mut page = doc
                .get_dictionary(id)
                .map_err(|e| AxevoraError::PdfWriteFailed(format!("page {number}: {e}")))?
                .clone();
            for key in INHERITABLE {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = lookup_inherited(doc, &page, key) {
                    page.set(key.to_vec(), value);
                }
            }
            if !page.has(b"MediaBox") {
                warn!("Page {} has no MediaBox; assuming A4", number);
                page.set(
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(A4_POINTS.0 as f32),
                        Object::Real(A4_POINTS.1 as f32),
                    ]),
                );
            }
            Ok(page)
        })
        .collect()
}

/// Value of `key` on the page or its nearest ancestor.
fn lookup_inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    if let Ok(value) = page.get(key) {
        return Some(value.clone());
    }
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let id = parent?;
        let node = doc.get_dictionary(id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Replace the document's page tree with a single flat node holding `pages`.
fn install_page_tree(doc: &mut Document, pages: Vec<Dictionary>) -> Result<(), AxevoraError> {
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    for mut page in pages {
        page.set("Parent", Object::Reference(pages_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut tree = Dictionary::new();
    tree.set("Type", Object::Name(b"Pages".to_vec()));
    tree.set("Count", Object::Integer(kids.len() as i64));
    tree.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(tree));

    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| AxevoraError::PdfWriteFailed(format!("missing catalog: {e}")))?;
    let catalog = doc
        .get_dictionary_mut(root_id)
        .map_err(|e| AxevoraError::PdfWriteFailed(format!("catalog: {e}")))?;
    catalog.set("Pages", Object::Reference(pages_id));

    let pruned = doc.prune_objects();
    debug!("Installed page tree, pruned {} objects", pruned.len());
    Ok(())
}

fn media_box_size(object: &Object) -> Option<(f64, f64)> {
    let Object::Array(values) = object else {
        return None;
    };
    let nums: Vec<f64> = values.iter().filter_map(number).collect();
    match nums.as_slice() {
        [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
        _ => None,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise byte-per-char).
fn text_string(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }
    Some(bytes.iter().map(|&b| b as char).collect())
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{Dictionary, Document, Object, Stream};

    /// Build an in-memory document whose page `i` is `100 + i` points wide.
    ///
    /// Resources live on the root Pages node so inheritance is exercised.
    pub(crate) fn numbered_pdf(pages: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        let font_id = doc.add_object(Object::Dictionary(font));

        let mut kids = Vec::new();
        for i in 0..pages {
            let text = format!("BT /F1 12 Tf 10 10 Td (Page {}) Tj ET", i + 1);
            let content_id =
                doc.add_object(Object::Stream(Stream::new(Dictionary::new(), text.into_bytes())));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(100 + i as i64),
                    Object::Integer(200),
                ]),
            );
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
        }

        let mut f1 = Dictionary::new();
        f1.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(f1));

        let mut tree = Dictionary::new();
        tree.set("Type", Object::Name(b"Pages".to_vec()));
        tree.set("Count", Object::Integer(pages as i64));
        tree.set("Kids", Object::Array(kids));
        tree.set("Resources", Object::Dictionary(resources));
        doc.objects.insert(pages_id, Object::Dictionary(tree));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    pub(crate) fn numbered_pdf_bytes(pages: usize) -> Vec<u8> {
        let mut doc = numbered_pdf(pages);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}
