//! Where the YAML stream comes from.

use crate::Result;
use anyhow::{Context, bail};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Cursor, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub const DEFAULT_EXTENSIONS: &[&str] = &[".yaml", ".yml"];

const TERMINAL_HINT: &str = "\
Receiving data from the terminal. Press CTRL+D when you're done typing or CTRL+C
to exit without processing the content. If you're seeing this by mistake, make
sure the command line flags, environment variables or config file are correct.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
    /// Every file under `path` whose extension is listed, concatenated.
    Folder {
        path: PathBuf,
        extensions: Vec<String>,
        recurse: bool,
    },
}

impl InputSource {
    /// Open the source as one buffered stream.
    pub fn open(&self, quiet: bool) -> Result<Box<dyn BufRead>> {
        match self {
            InputSource::Stdin => {
                let stdin = io::stdin();
                if !quiet && stdin.is_terminal() {
                    eprintln!("{TERMINAL_HINT}");
                }
                Ok(Box::new(stdin.lock()))
            }
            InputSource::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("unable to open file {:?}", path))?;
                Ok(Box::new(BufReader::new(file)))
            }
            InputSource::Folder {
                path,
                extensions,
                recurse,
            } => {
                let (data, count) = load_folder(path, extensions, *recurse)?;
                debug!(folder = %path.display(), files = count, "loaded input folder");
                Ok(Box::new(Cursor::new(data)))
            }
        }
    }
}

/// Lower-case an extension and make sure it starts with a dot.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') { ext } else { format!(".{ext}") }
}

/// Concatenate matching files in lexical path order, separated by `---`.
/// Symlinks are not followed. Returns the data and the number of files read.
pub fn load_folder(folder: &Path, extensions: &[String], recurse: bool) -> Result<(Vec<u8>, usize)> {
    let files = collect_files(folder, extensions, recurse)
        .with_context(|| format!("unable to read folder {:?}", folder))?;

    let mut buffer = Vec::new();
    for file in &files {
        let data = fs::read(file).with_context(|| format!("unable to read file {:?}", file))?;
        if !buffer.is_empty() {
            buffer.extend_from_slice(b"\n---\n");
        }
        buffer.extend_from_slice(&data);
    }

    if buffer.is_empty() {
        bail!(
            "no files found in {:?} with extensions: {}",
            folder,
            extensions.join(", ")
        );
    }
    Ok((buffer, files.len()))
}

fn collect_files(dir: &Path, extensions: &[String], recurse: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(dir).follow_links(false).sort_by_file_name();
    if !recurse {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()));
        if ext.is_some_and(|ext| extensions.contains(&ext)) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn exts() -> Vec<String> {
        DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    fn folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.yaml"), "b: 2").unwrap();
        fs::write(dir.path().join("a.YML"), "a: 1").unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.yaml"), "c: 3").unwrap();
        dir
    }

    #[test]
    fn folder_is_joined_in_lexical_order() {
        let dir = folder();
        let (data, count) = load_folder(dir.path(), &exts(), false).unwrap();
        assert_eq!(count, 2);
        assert_eq!(String::from_utf8(data).unwrap(), "a: 1\n---\nb: 2");
    }

    #[test]
    fn recurse_includes_subfolders() {
        let dir = folder();
        let (data, count) = load_folder(dir.path(), &exts(), true).unwrap();
        assert_eq!(count, 3);
        assert_eq!(String::from_utf8(data).unwrap(), "a: 1\n---\nb: 2\n---\nc: 3");
    }

    #[cfg(unix)]
    #[test]
    fn directory_symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), "a: 1").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let (data, count) = load_folder(dir.path(), &exts(), true).unwrap();
        assert_eq!(count, 1);
        assert_eq!(String::from_utf8(data).unwrap(), "a: 1");
    }

    #[test]
    fn custom_extensions() {
        let dir = folder();
        let (data, _) = load_folder(dir.path(), &[".txt".to_string()], false).unwrap();
        assert_eq!(data, b"skip me");
    }

    #[test]
    fn empty_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_folder(dir.path(), &exts(), true).unwrap_err();
        assert!(err.to_string().contains("no files found"), "{err}");
        assert!(err.to_string().ends_with(".yaml, .yml"), "{err}");
    }

    #[test]
    fn opens_a_file() {
        let dir = folder();
        let source = InputSource::File(dir.path().join("b.yaml"));
        let mut text = String::new();
        source.open(true).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "b: 2");
    }

    #[test]
    fn missing_file_has_context() {
        let err = InputSource::File(PathBuf::from("/definitely/not/here.yaml"))
            .open(true)
            .err()
            .unwrap();
        assert!(err.to_string().contains("unable to open file"), "{err}");
    }

    #[test]
    fn extension_normalization() {
        assert_eq!(normalize_extension("YAML"), ".yaml");
        assert_eq!(normalize_extension(" .json "), ".json");
    }
}
