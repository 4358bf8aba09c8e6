//! Writing sliced documents to disk or stdout.

use crate::Result;
use crate::output::NamedDocument;
use crate::render::funcs::plural;
use anyhow::Context;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Directory(PathBuf),
    Stdout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub target: OutputTarget,
    /// Report what would be written without touching the filesystem.
    pub dry_run: bool,
    /// Empty the output directory first.
    pub prune: bool,
    pub include_triple_dash: bool,
    /// Drop the `# File:` headers in stdout mode.
    pub remove_comments: bool,
    /// Silence progress and summary messages.
    pub quiet: bool,
}

pub struct Store<'a> {
    opts: &'a StoreOptions,
    stdout: &'a mut dyn Write,
    stderr: &'a mut dyn Write,
}

impl<'a> Store<'a> {
    pub fn new(opts: &'a StoreOptions, stdout: &'a mut dyn Write, stderr: &'a mut dyn Write) -> Self {
        Self {
            opts,
            stdout,
            stderr,
        }
    }

    /// Write every document and print the summary. Returns the file count.
    pub fn write_all(&mut self, docs: &[NamedDocument]) -> Result<usize> {
        if let OutputTarget::Directory(dir) = &self.opts.target {
            if self.opts.prune && !self.opts.dry_run && dir.exists() {
                debug!(dir = %dir.display(), "pruning output directory");
                prune_dir(dir)
                    .with_context(|| format!("unable to prune output directory {:?}", dir))?;
            }
        }

        for (i, doc) in docs.iter().enumerate() {
            let path = self.path_for(doc);
            let len = doc.content.len();
            debug!(path = %path.display(), bytes = len, "handling file");

            if self.opts.dry_run {
                self.status(format_args!("Would write {} -- {len} bytes.", path.display()))?;
                continue;
            }

            match &self.opts.target {
                OutputTarget::Stdout => {
                    if i > 0 {
                        writeln!(self.stdout, "---")?;
                    }
                    if !self.opts.remove_comments {
                        writeln!(self.stdout, "# File: {} ({len} bytes)", path.display())?;
                    }
                    self.stdout.write_all(&doc.content)?;
                    writeln!(self.stdout)?;
                }
                OutputTarget::Directory(_) => {
                    let data = self.file_contents(&doc.content);
                    write_file(&path, &data)?;
                    self.status(format_args!("Wrote {} -- {} bytes.", path.display(), data.len()))?;
                }
            }
        }

        let count = docs.len();
        let files = plural("file", count as i64);
        match (&self.opts.target, self.opts.dry_run) {
            (_, true) => self.status(format_args!("{count} {files} generated (dry-run)"))?,
            (OutputTarget::Stdout, false) => self.status(format_args!("{count} {files} parsed to stdout."))?,
            (OutputTarget::Directory(_), false) => self.status(format_args!("{count} {files} generated."))?,
        }
        Ok(count)
    }

    fn path_for(&self, doc: &NamedDocument) -> PathBuf {
        match &self.opts.target {
            OutputTarget::Directory(dir) => dir.join(&doc.filename),
            OutputTarget::Stdout => PathBuf::from(&doc.filename),
        }
    }

    /// Bytes as they land on disk: optional `---` prefix, trailing newline.
    fn file_contents(&self, content: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(content.len() + 5);
        if self.opts.include_triple_dash && content != b"---" {
            data.extend_from_slice(b"---\n");
        }
        data.extend_from_slice(content);
        if !data.ends_with(b"\n") {
            data.push(b'\n');
        }
        data
    }

    fn status(&mut self, msg: std::fmt::Arguments<'_>) -> Result<()> {
        if !self.opts.quiet {
            writeln!(self.stderr, "{msg}")?;
        }
        Ok(())
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    // Templates may render sub-directories.
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create directory for file {:?}", path))?;
    }
    fs::write(path, data).with_context(|| format!("unable to write file {:?}", path))
}

fn prune_dir(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
