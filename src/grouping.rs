use std::ops::Range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::layer::Layer;

/// One rung of the date-effective configuration: every layer attaching at
/// or above `attachment` (until the next rung) takes `effective_start`.
/// A rung may be declared with no date yet; layers it covers are
/// undetermined rather than falling through to the tower default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateEntry {
    pub attachment: u64,
    pub effective_start: Option<NaiveDate>,
}

/// Attachment-keyed effective-date overrides for a tower. Entries need
/// not be sorted; lookup picks the highest rung at or below the queried
/// attachment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateConfig {
    pub entries: Vec<DateEntry>,
}

impl DateConfig {
    /// The rung governing a given attachment, if any covers it.
    fn entry_at(&self, attachment: u64) -> Option<&DateEntry> {
        self.entries
            .iter()
            .filter(|e| e.attachment <= attachment)
            .max_by_key(|e| e.attachment)
    }
}

/// A maximal run of adjacent layers sharing one effective start date.
/// `effective_start` is `None` when the covering rung has no date yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup {
    pub effective_start: Option<NaiveDate>,
    pub layers: Range<usize>,
}

/// Partition a tower into contiguous runs of layers that go on risk
/// together. Layers below the lowest configured rung, or in a tower with
/// no configuration at all, take the tower-level `fallback` inception.
pub fn group_by_effective_date(
    layers: &[Layer],
    config: Option<&DateConfig>,
    fallback: NaiveDate,
) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();
    for (index, layer) in layers.iter().enumerate() {
        let effective_start = match config.and_then(|c| c.entry_at(layer.attachment)) {
            Some(entry) => entry.effective_start,
            None => Some(fallback),
        };
        match groups.last_mut() {
            Some(group) if group.effective_start == effective_start => {
                group.layers.end = index + 1;
            }
            _ => groups.push(DateGroup { effective_start, layers: index..index + 1 }),
        }
    }
    groups
}
