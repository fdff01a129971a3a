//! Charlist resources for CTC decoding.

use std::path::Path;

use tracing::debug;

use crate::error::DecodeError;

/// Ordered symbol set for a CTC labeling model.
///
/// Label indices are offset by one: label `0` is the CTC blank and is
/// never stored here, label `i > 0` maps to `symbols[i - 1]`. A model
/// emitting `L` label columns therefore needs a charlist with at least
/// `L - 1` symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charlist {
    symbols: Vec<char>,
}

impl Charlist {
    /// Build a charlist from an explicit symbol list.
    pub fn from_symbols(symbols: Vec<char>) -> Result<Self, DecodeError> {
        if symbols.is_empty() {
            return Err(DecodeError::EmptyCharlist);
        }
        Ok(Self { symbols })
    }

    /// Load a charlist from a file.
    ///
    /// Charlist files have one symbol per line; the first character of
    /// each line is taken and empty lines are skipped. The blank is
    /// implicit and must not appear in the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DecodeError::CharlistLoad(format!("{}: {}", path.as_ref().display(), e)))?;
        let charlist = Self::from_text(&content)?;
        debug!(
            "Loaded charlist with {} symbols from {}",
            charlist.len(),
            path.as_ref().display()
        );
        Ok(charlist)
    }

    /// Load a charlist from any reader, e.g. an embedded resource.
    pub fn from_reader<R: std::io::Read>(mut reader: R) -> Result<Self, DecodeError> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| DecodeError::CharlistLoad(e.to_string()))?;
        Self::from_text(&content)
    }

    /// Parse charlist file content.
    pub fn from_text(text: &str) -> Result<Self, DecodeError> {
        let symbols: Vec<char> = text.lines().filter_map(|line| line.chars().next()).collect();
        Self::from_symbols(symbols)
    }

    /// Number of symbols, not counting the blank.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Number of labels the charlist covers, counting the blank.
    pub fn label_count(&self) -> usize {
        self.symbols.len() + 1
    }

    /// Resolve a label index to its symbol.
    ///
    /// Returns `None` for the blank (label 0) and for labels past the
    /// end of the charlist.
    pub fn symbol(&self, label: usize) -> Option<char> {
        if label == 0 {
            return None;
        }
        self.symbols.get(label - 1).copied()
    }

    /// The symbols in label order, blank excluded.
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_from_text_takes_first_char_per_line() {
        let charlist = Charlist::from_text("a\nb\ncd\n").unwrap();
        assert_eq!(charlist.symbols(), &['a', 'b', 'c']);
    }

    #[test]
    fn test_from_text_skips_empty_lines() {
        let charlist = Charlist::from_text("a\n\nb\n").unwrap();
        assert_eq!(charlist.symbols(), &['a', 'b']);
        assert_eq!(charlist.len(), 2);
    }

    #[test]
    fn test_from_text_empty_is_rejected() {
        assert!(matches!(
            Charlist::from_text(""),
            Err(DecodeError::EmptyCharlist)
        ));
        assert!(matches!(
            Charlist::from_text("\n\n"),
            Err(DecodeError::EmptyCharlist)
        ));
    }

    #[test]
    fn test_label_mapping_is_offset_by_blank() {
        let charlist = Charlist::from_symbols(vec!['A', 'B', 'C']).unwrap();
        assert_eq!(charlist.label_count(), 4);
        assert_eq!(charlist.symbol(0), None);
        assert_eq!(charlist.symbol(1), Some('A'));
        assert_eq!(charlist.symbol(3), Some('C'));
        assert_eq!(charlist.symbol(4), None);
    }

    #[test]
    fn test_from_reader_matches_from_text() {
        let charlist = Charlist::from_reader("x\ny\n".as_bytes()).unwrap();
        assert_eq!(charlist.symbols(), &['x', 'y']);
    }

    #[test]
    fn test_from_file_missing_path() {
        let err = Charlist::from_file("definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, DecodeError::CharlistLoad(_)));
    }
}
