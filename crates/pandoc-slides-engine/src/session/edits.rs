use serde::{Deserialize, Serialize};

use crate::protocol::SourceRange;

/// One change reported by the editor: `range` (0-based, pre-edit) was
/// replaced with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    pub range: SourceRange,
    pub text: String,
}

impl ContentChange {
    pub fn new(range: SourceRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    /// True if applying the change can move later lines up or down.
    ///
    /// Edits confined to one line leave line numbers alone even when columns
    /// on that line shift; those are tolerated as stale.
    pub fn shifts_lines(&self) -> bool {
        !self.range.is_single_line() || self.text.contains('\n')
    }

    /// Net number of lines added (positive) or removed (negative).
    pub fn line_delta(&self) -> i64 {
        let inserted = self.text.matches('\n').count() as i64;
        let removed = i64::from(self.range.end.line) - i64::from(self.range.start.line);
        inserted - removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SourceRange::new(3, 2, 3, 2), "x", false)]
    #[case(SourceRange::new(3, 2, 3, 9), "", false)]
    #[case(SourceRange::new(3, 2, 3, 9), "renamed", false)]
    #[case(SourceRange::new(3, 2, 3, 2), "\n", true)]
    #[case(SourceRange::new(3, 2, 4, 0), "", true)]
    #[case(SourceRange::new(3, 2, 4, 0), " ", true)]
    #[case(SourceRange::new(1, 0, 1, 0), "line\nline\n", true)]
    fn test_shifts_lines(#[case] range: SourceRange, #[case] text: &str, #[case] expected: bool) {
        assert_eq!(ContentChange::new(range, text).shifts_lines(), expected);
    }

    #[test]
    fn test_line_delta() {
        assert_eq!(
            ContentChange::new(SourceRange::new(3, 2, 3, 2), "a\nb\n").line_delta(),
            2
        );
        assert_eq!(
            ContentChange::new(SourceRange::new(3, 0, 6, 0), "").line_delta(),
            -3
        );
        assert_eq!(
            ContentChange::new(SourceRange::new(3, 0, 4, 0), "x\n").line_delta(),
            0
        );
    }
}
