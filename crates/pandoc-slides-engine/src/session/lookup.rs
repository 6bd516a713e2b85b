use serde::{Deserialize, Serialize};

use crate::protocol::{SlideCoordinate, SourcePosition, SourceRange, SourceposRecord};

/// Association between a source range and the slide generated from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub range: SourceRange,
    pub coordinate: SlideCoordinate,
}

impl PositionRecord {
    pub fn new(range: SourceRange, coordinate: SlideCoordinate) -> Self {
        Self { range, coordinate }
    }
}

/// Source range → slide table for the paired document.
///
/// Built in full from one `sourcepos` batch; never merged with an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    records: Vec<PositionRecord>,
}

impl LookupTable {
    /// Build a table from a renderer batch, skipping annotations that do not
    /// parse. Record order follows the batch.
    pub fn from_batch(batch: &[SourceposRecord]) -> Self {
        let records = batch
            .iter()
            .filter_map(|record| match SourceRange::parse(&record.sourcepos) {
                Ok(range) => Some(PositionRecord::new(range, record.coordinate)),
                Err(e) => {
                    log::warn!("Skipping slide {}: {e}", record.coordinate);
                    None
                }
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[PositionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The narrowest record whose range contains `position`. Among equally
    /// narrow ranges the earliest record wins.
    pub fn find(&self, position: SourcePosition) -> Option<&PositionRecord> {
        self.records
            .iter()
            .filter(|record| record.range.contains(position))
            .min_by_key(|record| {
                (
                    record.range.end.line - record.range.start.line,
                    record.range.end.column.abs_diff(record.range.start.column),
                )
            })
    }
}
