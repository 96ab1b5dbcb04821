//! Change detection between successive result snapshots.
//!
//! Compares the previous and next snapshot of a stage's output and
//! classifies each item as unseen, changed, or unchanged. Runs once per
//! completed refresh of the terminal stage, against the snapshot stored at
//! the previous completion.

use std::collections::{HashMap, HashSet};

use crate::core::ResultRecord;
use crate::fingerprint::{fingerprint, Fingerprint};

/// The outcome of comparing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    /// Items whose fingerprint was absent from the previous snapshot.
    pub new_count: usize,
    /// Items present before whose mutable fields differ textually.
    pub changed_count: usize,
    /// Fingerprints of all new or changed items, for per-item highlighting.
    pub changed_keys: HashSet<Fingerprint>,
}

impl DiffReport {
    /// Returns true if nothing new or changed was detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_count == 0 && self.changed_count == 0
    }
}

/// Compares two snapshots of a stage's result list.
///
/// A first sighting (`previous` absent) is initial load, never "new": the
/// report is all-zero. Otherwise each record in `next` is classified by
/// fingerprint: unseen fingerprints count as new, seen fingerprints whose
/// mutable subset (description, severity) differs count as changed, and
/// everything else is ignored. Items that disappeared are not reported.
#[must_use]
pub fn diff(previous: Option<&[ResultRecord]>, next: &[ResultRecord]) -> DiffReport {
    let Some(previous) = previous else {
        return DiffReport::default();
    };

    let prior: HashMap<Fingerprint, &ResultRecord> = previous
        .iter()
        .map(|record| (fingerprint(record), record))
        .collect();

    let mut report = DiffReport::default();
    for record in next {
        let key = fingerprint(record);
        match prior.get(&key) {
            None => {
                report.new_count += 1;
                report.changed_keys.insert(key);
            }
            Some(old) if mutable_fields_differ(old, record) => {
                report.changed_count += 1;
                report.changed_keys.insert(key);
            }
            Some(_) => {}
        }
    }

    report
}

/// Textual comparison over the designated mutable subset of fields.
fn mutable_fields_differ(old: &ResultRecord, new: &ResultRecord) -> bool {
    old.description != new.description || old.severity != new.severity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::DESCRIPTION_PREFIX_LEN;
    use pretty_assertions::assert_eq;

    fn record(name: &str, date: &str, desc: &str) -> ResultRecord {
        ResultRecord::new(name, "", date, desc)
    }

    #[test]
    fn test_first_sight_is_all_zero() {
        let next = vec![record("A", "2024-01-01", "x"), record("B", "2024-02-01", "y")];
        let report = diff(None, &next);
        assert_eq!(report, DiffReport::default());
        assert!(report.is_empty());
    }

    #[test]
    fn test_identical_lists_are_quiet() {
        let list = vec![record("A", "2024-01-01", "x"), record("B", "2024-02-01", "y")];
        let report = diff(Some(&list), &list.clone());
        assert!(report.is_empty());
        assert!(report.changed_keys.is_empty());
    }

    #[test]
    fn test_new_item_detected() {
        let prev = vec![record("A", "2024-01-01", "x")];
        let next = vec![record("A", "2024-01-01", "x"), record("B", "2024-02-01", "y")];

        let report = diff(Some(&prev), &next);
        assert_eq!(report.new_count, 1);
        assert_eq!(report.changed_count, 0);
        assert_eq!(report.changed_keys.len(), 1);
        assert!(report
            .changed_keys
            .contains(&fingerprint(&record("B", "2024-02-01", "y"))));
    }

    #[test]
    fn test_changed_severity_detected() {
        let prev = vec![record("A", "2024-01-01", "x").with_severity("low")];
        let next = vec![record("A", "2024-01-01", "x").with_severity("critical")];

        let report = diff(Some(&prev), &next);
        assert_eq!(report.new_count, 0);
        assert_eq!(report.changed_count, 1);
    }

    #[test]
    fn test_changed_description_beyond_prefix_detected() {
        // The fingerprint only sees the prefix, so a drifting tail keeps the
        // identity but still counts as a textual change.
        let prefix = "p".repeat(DESCRIPTION_PREFIX_LEN);
        let prev = vec![record("A", "2024-01-01", &format!("{prefix} old tail"))];
        let next = vec![record("A", "2024-01-01", &format!("{prefix} new tail"))];

        let report = diff(Some(&prev), &next);
        assert_eq!(report.new_count, 0);
        assert_eq!(report.changed_count, 1);
    }

    #[test]
    fn test_disappeared_items_not_reported() {
        let prev = vec![record("A", "2024-01-01", "x"), record("B", "2024-02-01", "y")];
        let next = vec![record("A", "2024-01-01", "x")];

        let report = diff(Some(&prev), &next);
        assert!(report.is_empty());
    }

    #[test]
    fn test_empty_previous_list_marks_everything_new() {
        // An empty prior snapshot is a real (second) observation, unlike None.
        let prev: Vec<ResultRecord> = Vec::new();
        let next = vec![record("A", "2024-01-01", "x")];

        let report = diff(Some(&prev), &next);
        assert_eq!(report.new_count, 1);
    }
}
