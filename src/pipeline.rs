//! The slicing loop: scan, parse, filter, name, aggregate, sort.

use crate::error::SliceError;
use crate::filter::{FilterRules, FilterSpec, Verdict};
use crate::manifest::{ResourceIdentity, parse_manifest};
use crate::output::{NamedDocument, OutputSet, sort_by_kind};
use crate::render::NameRenderer;
use crate::scan::Scanner;
use std::io::BufRead;
use tracing::{debug, info};

/// Validated, compiled slicing configuration. Built once per run.
#[derive(Debug)]
pub struct Slicer {
    rules: FilterRules,
    renderer: NameRenderer,
    sort_by_kind: bool,
}

impl Slicer {
    /// Validate the filters and compile the template. Fails before any input
    /// is read.
    pub fn new(filters: &FilterSpec, template: &str, sort_by_kind: bool) -> Result<Self, SliceError> {
        Ok(Self {
            rules: filters.validate_and_build()?,
            renderer: NameRenderer::new(template)?,
            sort_by_kind,
        })
    }

    /// Slice a whole stream. Any fatal error discards everything collected so
    /// far.
    pub fn slice<R: BufRead>(&self, reader: R) -> Result<Vec<NamedDocument>, SliceError> {
        let mut output = OutputSet::new();
        let mut seen = 0usize;
        let mut skipped = 0usize;

        for raw in Scanner::new(reader) {
            let raw = raw?;
            seen = raw.ordinal;
            if raw.is_empty() {
                debug!(ordinal = raw.ordinal, "empty document, ignoring");
                continue;
            }

            let manifest = parse_manifest(&raw)?;
            let identity = ResourceIdentity::from_manifest(&manifest);

            if let Verdict::Skip(reason) = self.rules.evaluate(&identity, raw.ordinal)? {
                debug!(ordinal = raw.ordinal, %reason, "skipping document");
                skipped += 1;
                continue;
            }

            let filename = self.renderer.render(&manifest, raw.ordinal, &identity)?;
            debug!(ordinal = raw.ordinal, %filename, "rendered file name");
            output.insert(NamedDocument {
                filename,
                identity,
                content: raw.content,
            });
        }

        if output.is_empty() {
            debug!(documents = seen, "no documents selected for output");
        } else if self.sort_by_kind {
            sort_by_kind(&mut output);
        }

        info!(
            documents = seen,
            skipped,
            files = output.len(),
            "finished slicing input"
        );
        Ok(output.into_documents())
    }
}
