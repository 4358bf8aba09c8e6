//! Splits a byte stream into raw YAML documents at `---` lines.
//!
//! The stream is consumed one line at a time and every document keeps its
//! exact bytes, comments included, for the output files.

use crate::error::SliceError;
use std::io::BufRead;

/// One document exactly as it appeared between two separators, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// 1-based position in the stream, counting every boundary seen.
    pub ordinal: usize,
    pub content: Vec<u8>,
}

impl RawDocument {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Iterator over the documents of a stream.
pub struct Scanner<R> {
    reader: R,
    ordinal: usize,
    done: bool,
}

impl<R: BufRead> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            ordinal: 0,
            done: false,
        }
    }

    /// Read lines until the next separator or EOF.
    fn next_fragment(&mut self) -> Result<Option<RawDocument>, SliceError> {
        let mut local = Vec::new();
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut line)
                .map_err(|source| SliceError::Read {
                    ordinal: self.ordinal + 1,
                    source,
                })?;

            if read == 0 {
                self.done = true;
                break;
            }

            if is_separator(&line) {
                break;
            }

            local.extend_from_slice(&line);
        }

        self.ordinal += 1;
        let content = local.trim_ascii().to_vec();

        // A stream starting with "---" is valid YAML: the empty preface is
        // not a document, but it still consumes an ordinal.
        if self.ordinal == 1 && content.is_empty() && !self.done {
            return self.next_fragment();
        }

        Ok(Some(RawDocument {
            ordinal: self.ordinal,
            content,
        }))
    }
}

impl<R: BufRead> Iterator for Scanner<R> {
    type Item = Result<RawDocument, SliceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let fragment = self.next_fragment();
        if fragment.is_err() {
            self.done = true;
        }
        fragment.transpose()
    }
}

fn is_separator(line: &[u8]) -> bool {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    line == b"---"
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn scan(input: &str) -> Vec<(usize, String)> {
        Scanner::new(Cursor::new(input.as_bytes()))
            .map(|doc| {
                let doc = doc.unwrap();
                (doc.ordinal, String::from_utf8(doc.content).unwrap())
            })
            .collect()
    }

    #[test]
    fn splits_on_separator_lines() {
        let docs = scan("a: 1\n---\nb: 2\n---\nc: 3\n");
        assert_eq!(
            docs,
            vec![
                (1, "a: 1".to_string()),
                (2, "b: 2".to_string()),
                (3, "c: 3".to_string()),
            ]
        );
    }

    #[test]
    fn n_separators_yield_n_plus_one_fragments() {
        let docs = scan("a: 1\n---\n---\nb: 2\n---\n");
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[1], (2, String::new()));
        assert_eq!(docs[3], (4, String::new()));
    }

    #[test]
    fn leading_separator_is_not_a_document_but_counts() {
        let docs = scan("---\nkind: Pod\n---\nkind: Service\n");
        assert_eq!(
            docs,
            vec![(2, "kind: Pod".to_string()), (3, "kind: Service".to_string())]
        );
    }

    #[test]
    fn accepts_crlf_separators() {
        let docs = scan("a: 1\r\n---\r\nb: 2\r\n");
        assert_eq!(docs, vec![(1, "a: 1".to_string()), (2, "b: 2".to_string())]);
    }

    #[test]
    fn separator_must_be_the_whole_line() {
        let docs = scan("a: |\n  --- not a separator\n--- # neither\nb: 2\n");
        assert_eq!(docs.len(), 1);
        assert!(docs[0].1.contains("--- # neither"));
    }

    #[test]
    fn final_separator_without_newline() {
        let docs = scan("a: 1\n---");
        assert_eq!(docs, vec![(1, "a: 1".to_string()), (2, String::new())]);
    }

    #[test]
    fn single_document_is_preserved_modulo_whitespace() {
        let input = "\n\n# comment\napiVersion: v1\nkind: Pod  # trailing\nmetadata:\n  name: x\n\n";
        let docs = scan(input);
        assert_eq!(docs, vec![(1, input.trim().to_string())]);
    }

    #[test]
    fn empty_input_yields_one_empty_fragment() {
        assert_eq!(scan(""), vec![(1, String::new())]);
    }
}
