// ============================================================
// Layer 4 — Dialogue Corpus Loader
// ============================================================
// Reads a UTF-8 dialogue file with one pair per line:
//
//   <prompt>\t<response>\n        (or \r\n)
//
// For every line:
//   1. Match the two-field pattern; lines that don't match
//      (no tab, empty field, no line terminator) are skipped
//   2. Reject pairs containing excluded-script characters
//   3. Tokenise both fields
//   4. Optionally drop pairs where either side is too long
//
// Finally the list is cut down to a multiple of the batch size
// so every training iteration sees a full batch.
//
// Reference: Rust Book §12 (I/O and File Handling)
//            regex crate documentation

use anyhow::{Context, Result};
use regex::Regex;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::traits::PairSource;
use crate::domain::utterance::UtterancePair;

const LINE_PATTERN: &str = r"(.+?)\t(.+?)(?:\r\n|\n)";

/// Loads utterance pairs from a tab-separated dialogue file.
/// Implements the PairSource trait from Layer 3.
pub struct CorpusLoader {
    path:         PathBuf,
    preprocessor: Preprocessor,
    pattern:      Regex,
    /// Both sides must have at most this many tokens, when set
    max_length:   Option<usize>,
    batch_size:   usize,
}

impl CorpusLoader {
    pub fn new(
        path:         impl Into<PathBuf>,
        preprocessor: Preprocessor,
        max_length:   Option<usize>,
        batch_size:   usize,
    ) -> Result<Self> {
        let pattern = Regex::new(LINE_PATTERN).context("Invalid corpus line pattern")?;
        Ok(Self {
            path: path.into(),
            preprocessor,
            pattern,
            max_length,
            batch_size,
        })
    }

    /// Split a raw line (terminator included) into prompt and response.
    pub fn split_line<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.pattern.captures(line)?;
        Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }

    /// Filter and tokenise one raw line. `Ok(None)` means the line
    /// contributes no pair.
    pub fn parse_line(&self, line: &str) -> Result<Option<UtterancePair>> {
        let Some((prompt, response)) = self.split_line(line) else {
            return Ok(None);
        };
        if !self.preprocessor.is_target_script(prompt)
            || !self.preprocessor.is_target_script(response)
        {
            return Ok(None);
        }

        let pair = UtterancePair::new(
            self.preprocessor.tokenize(prompt)?,
            self.preprocessor.tokenize(response)?,
        );
        match self.max_length {
            Some(max) if !pair.fits(max) => Ok(None),
            _ => Ok(Some(pair)),
        }
    }

    /// Parse every line of `reader`, then truncate to a batch multiple.
    pub fn read_pairs<R: BufRead>(&self, mut reader: R) -> Result<Vec<UtterancePair>> {
        let mut pairs   = Vec::new();
        let mut line    = String::new();
        let mut skipped = 0usize;

        loop {
            line.clear();
            // read_line keeps the terminator, which the pattern requires
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            match self.parse_line(&line)? {
                Some(pair) => pairs.push(pair),
                None => {
                    skipped += 1;
                    tracing::trace!("Skipped line: {:?}", line);
                }
            }
        }

        let dropped = truncate_to_batch_multiple(&mut pairs, self.batch_size);
        tracing::info!(
            "{} pairs collected ({} lines skipped, {} dropped for batch alignment)",
            pairs.len(),
            skipped,
            dropped,
        );
        Ok(pairs)
    }
}

impl PairSource for CorpusLoader {
    fn load_pairs(&self) -> Result<Vec<UtterancePair>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open corpus '{}'", self.path.display()))?;
        self.read_pairs(BufReader::new(file))
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))
    }
}

/// Drop trailing items so `items.len()` is a multiple of `batch_size`.
/// Returns how many were dropped.
pub fn truncate_to_batch_multiple<T>(items: &mut Vec<T>, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    let keep    = items.len() - items.len() % batch_size;
    let dropped = items.len() - keep;
    items.truncate(keep);
    dropped
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn loader(max_length: Option<usize>, batch_size: usize) -> CorpusLoader {
        CorpusLoader::new("unused.txt", Preprocessor::new(), max_length, batch_size).unwrap()
    }

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_single_pair() {
        let pairs = loader(None, 1)
            .read_pairs(Cursor::new("hello there\thi friend\n"))
            .unwrap();
        assert_eq!(pairs, vec![UtterancePair::new(words("hello there"), words("hi friend"))]);
    }

    #[test]
    fn test_crlf_terminator() {
        let pairs = loader(None, 1).read_pairs(Cursor::new("a b\tc d\r\n")).unwrap();
        assert_eq!(pairs[0].response, words("c d"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = "no tab here\n\tmissing prompt\nmissing response\t\n\nlast\tline";
        let pairs = loader(None, 1).read_pairs(Cursor::new(text)).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_excluded_script_pairs_are_skipped() {
        let text = "hello\tこんにちは\n世界\thello\nok\tfine\n";
        let pairs = loader(None, 1).read_pairs(Cursor::new(text)).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].prompt, words("ok"));
    }

    #[test]
    fn test_size_filter_requires_both_sides() {
        let text = "a b c\td\na\tb c d\na b\tc d\n";
        let pairs = loader(Some(2), 1).read_pairs(Cursor::new(text)).unwrap();
        assert_eq!(pairs, vec![UtterancePair::new(words("a b"), words("c d"))]);
    }

    #[test]
    fn test_truncates_to_batch_multiple() {
        let text = "a\tb\nc\td\ne\tf\ng\th\ni\tj\n";
        let pairs = loader(None, 2).read_pairs(Cursor::new(text)).unwrap();
        assert_eq!(pairs.len(), 4);
        // the excess is dropped from the end
        assert_eq!(pairs[3].prompt, words("g"));
    }

    #[test]
    fn test_truncate_helper() {
        for n in 0..25usize {
            let mut items: Vec<usize> = (0..n).collect();
            truncate_to_batch_multiple(&mut items, 7);
            assert_eq!(items.len() % 7, 0);
        }
    }

    #[test]
    fn test_extra_tabs_stay_in_response() {
        let l = loader(None, 1);
        assert_eq!(l.split_line("a\tb\tc\n"), Some(("a", "b\tc")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let l = CorpusLoader::new("/no/such/corpus.txt", Preprocessor::new(), None, 1).unwrap();
        assert!(l.load_pairs().is_err());
    }
}
