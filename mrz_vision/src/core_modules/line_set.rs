// THEORY:
// A `LineSet` is the minimal unit the classifier operates on: a short, ordered
// list of fixed-width text lines as they came out of the recognizer. It knows
// nothing about layouts. Checkers ask it for its shape and reject it cheaply
// before doing any deep validation.

use std::fmt;

/// An ordered set of recognized MRZ text lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LineSet {
    lines: Vec<String>,
}

impl LineSet {
    /// Builds a line set, trimming surrounding whitespace and skipping blank lines.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Self { lines }
    }

    /// Splits newline-separated recognizer output into a line set.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Length of each line in characters.
    pub fn line_lengths(&self) -> Vec<usize> {
        self.lines.iter().map(|l| l.chars().count()).collect()
    }
}

impl fmt::Display for LineSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}
