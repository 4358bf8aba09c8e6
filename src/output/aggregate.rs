//! Collects rendered documents by file name.

use crate::manifest::ResourceIdentity;
use indexmap::IndexMap;
use indexmap::map::Entry;

/// Inserted between documents that share a file name.
pub const MERGE_SEPARATOR: &[u8] = b"\n---\n";

/// A document (or several merged ones) ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedDocument {
    pub filename: String,
    pub identity: ResourceIdentity,
    pub content: Vec<u8>,
}

/// Output documents keyed by file name, in first-seen order.
#[derive(Debug, Default)]
pub struct OutputSet {
    docs: IndexMap<String, NamedDocument>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. A file name seen before keeps its position; the new
    /// content is appended after a separator and the identity is replaced.
    pub fn insert(&mut self, doc: NamedDocument) {
        match self.docs.entry(doc.filename.clone()) {
            Entry::Vacant(slot) => {
                tracing::debug!(file = %doc.filename, "new output file");
                slot.insert(doc);
            }
            Entry::Occupied(mut slot) => {
                tracing::debug!(file = %doc.filename, "appending to existing output file");
                let existing = slot.get_mut();
                existing.content.extend_from_slice(MERGE_SEPARATOR);
                existing.content.extend_from_slice(&doc.content);
                existing.identity = doc.identity;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &NamedDocument> {
        self.docs.values()
    }

    pub(crate) fn docs_mut(&mut self) -> &mut IndexMap<String, NamedDocument> {
        &mut self.docs
    }

    pub fn into_documents(self) -> Vec<NamedDocument> {
        self.docs.into_values().collect()
    }
}
