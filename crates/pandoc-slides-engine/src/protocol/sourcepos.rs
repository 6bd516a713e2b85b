use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// `L:C-L:C` after the last `@` of a pandoc `data-pos` annotation.
fn range_pattern() -> &'static Regex {
    static RANGE_REGEX: OnceLock<Regex> = OnceLock::new();
    RANGE_REGEX.get_or_init(|| {
        Regex::new(r"^(\d+):(\d+)-(\d+):(\d+)$").expect("Invalid source range regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceposError {
    #[error("Malformed source position annotation: {0:?}")]
    Malformed(String),
    #[error("Source position annotation {0:?} ends before it starts")]
    Reversed(String),
}

/// A 0-based line/column position in a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Half-open range over a source document, 0-based in memory.
///
/// On the wire ranges are 1-based and written `L:C-L:C`, optionally prefixed
/// by an identifier and `@`. Parsing always yields `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start: SourcePosition::new(start_line, start_column),
            end: SourcePosition::new(end_line, end_column),
        }
    }

    /// Parse a converter annotation such as `intro.md@3:5-3:12`.
    ///
    /// Everything up to the last `@` is discarded. The four numbers are
    /// 1-based and are converted to 0-based; a zero component is malformed.
    pub fn parse(annotation: &str) -> Result<Self, SourceposError> {
        let range_text = annotation.rsplit('@').next().unwrap_or(annotation);
        let captures = range_pattern()
            .captures(range_text)
            .ok_or_else(|| SourceposError::Malformed(annotation.to_string()))?;

        let mut parts = [0u32; 4];
        for (slot, index) in parts.iter_mut().zip(1..=4) {
            let value: u32 = captures[index]
                .parse()
                .map_err(|_| SourceposError::Malformed(annotation.to_string()))?;
            *slot = value
                .checked_sub(1)
                .ok_or_else(|| SourceposError::Malformed(annotation.to_string()))?;
        }

        let range = Self::new(parts[0], parts[1], parts[2], parts[3]);
        if range.start > range.end {
            return Err(SourceposError::Reversed(annotation.to_string()));
        }
        Ok(range)
    }

    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }

    /// True if `position` lies within the range. An empty range contains
    /// only its own start.
    pub fn contains(&self, position: SourcePosition) -> bool {
        if self.start == self.end {
            return position == self.start;
        }
        self.start <= position && position < self.end
    }
}

impl fmt::Display for SourceRange {
    /// Writes the 1-based wire form without an identifier prefix.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line + 1,
            self.start.column + 1,
            self.end.line + 1,
            self.end.column + 1
        )
    }
}
