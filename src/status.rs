//! Classification of a commit's combined CI status.

use crate::types::{CheckState, CombinedStatus};

/// Failed and pending context names for one commit.
///
/// Successful and skipped contexts are excluded; a commit is clean iff both
/// sets are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusClassification {
    pub failed: Vec<String>,
    pub pending: Vec<String>,
}

impl StatusClassification {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.pending.is_empty()
    }
}

/// Sorts every status context into the failed or pending set.
pub fn classify(combined: &CombinedStatus) -> StatusClassification {
    let mut classification = StatusClassification::default();

    for status in &combined.statuses {
        match status.state {
            CheckState::Failure | CheckState::Error => {
                classification.failed.push(status.context.clone());
            }
            CheckState::Pending => classification.pending.push(status.context.clone()),
            CheckState::Success | CheckState::Skipped | CheckState::Unknown => {}
        }
    }

    classification
}
