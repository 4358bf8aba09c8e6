//! File name rendering.
//!
//! A [`NameRenderer`] owns one compiled template and its function registry.
//! Both are built once, before the first document is read.

pub mod funcs;
pub mod template;

pub use funcs::FunctionRegistry;
pub use template::{MISSING_VALUE, Template, TemplateError};

use crate::error::SliceError;
use crate::manifest::{ResourceIdentity, Value};

pub const DEFAULT_TEMPLATE: &str = "{{.kind | lower}}-{{.metadata.name}}.yaml";

#[derive(Debug)]
pub struct NameRenderer {
    template: Template,
    funcs: FunctionRegistry,
}

impl NameRenderer {
    /// Compile `source`; an empty string selects [`DEFAULT_TEMPLATE`].
    pub fn new(source: &str) -> Result<Self, SliceError> {
        let funcs = FunctionRegistry::new()
            .map_err(|e| SliceError::config(format!("template functions: {e}")))?;
        Self::with_functions(source, funcs)
    }

    pub fn with_functions(source: &str, funcs: FunctionRegistry) -> Result<Self, SliceError> {
        let source = if source.is_empty() { DEFAULT_TEMPLATE } else { source };
        let template = Template::parse(source, &funcs).map_err(SliceError::Template)?;
        Ok(Self { template, funcs })
    }

    /// Render the file name for one document.
    ///
    /// The result is trimmed, missing-value placeholders and line breaks are
    /// removed, and a name that is empty once its extension is dropped is an
    /// error.
    pub fn render(
        &self,
        manifest: &Value,
        ordinal: usize,
        identity: &ResourceIdentity,
    ) -> Result<String, SliceError> {
        let rendered = self
            .template
            .execute(&self.funcs, manifest)
            .map_err(|source| SliceError::Render { ordinal, source })?;

        let name = rendered
            .trim()
            .replace(MISSING_VALUE, "")
            .replace('\n', "");

        if strip_extension(&name).is_empty() {
            return Err(SliceError::EmptyName {
                ordinal,
                identity: identity.clone(),
            });
        }
        Ok(name)
    }
}

/// `name` without its extension: the part from the last `.` of the final
/// path element onwards.
fn strip_extension(name: &str) -> &str {
    let base_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[base_start..].rfind('.') {
        Some(dot) => &name[..base_start + dot],
        None => name,
    }
}
