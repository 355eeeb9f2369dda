//! Diff calculation for new-item notifications.
//!
//! Compares a fresh collection run against the stored history and keeps
//! only records that were never seen before.

use crate::models::Record;

/// Calculator for new records between history and a fresh run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffCalculator;

impl DiffCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Records of `fresh` not structurally equal to any record in `history`.
    ///
    /// Keeps the order of `fresh`. Repeated records inside `fresh` are all
    /// kept when they are new.
    pub fn calculate(&self, history: &[Record], fresh: &[Record]) -> Vec<Record> {
        fresh
            .iter()
            .filter(|record| !history.contains(record))
            .cloned()
            .collect()
    }
}

/// Convenience function to calculate new records.
pub fn diff(history: &[Record], fresh: &[Record]) -> Vec<Record> {
    DiffCalculator::new().calculate(history, fresh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(id: &str, title: &str) -> Record {
        Record::from_pairs([("id", id), ("title", title)]).unwrap()
    }

    #[test]
    fn test_no_changes() {
        let history = vec![make_record("1", "Bike"), make_record("2", "Car")];
        let fresh = history.clone();

        assert!(diff(&history, &fresh).is_empty());
    }

    #[test]
    fn test_additions_keep_order() {
        let history = vec![make_record("1", "Bike")];
        let fresh = vec![
            make_record("3", "Boat"),
            make_record("1", "Bike"),
            make_record("2", "Car"),
        ];

        let new = diff(&history, &fresh);
        assert_eq!(new, vec![make_record("3", "Boat"), make_record("2", "Car")]);
    }

    #[test]
    fn test_changed_value_is_new() {
        let history = vec![make_record("1", "Old Title")];
        let fresh = vec![make_record("1", "New Title")];

        assert_eq!(diff(&history, &fresh), fresh);
    }

    #[test]
    fn test_duplicates_in_fresh_are_kept() {
        let fresh = vec![make_record("1", "Bike"), make_record("1", "Bike")];

        assert_eq!(diff(&[], &fresh).len(), 2);
    }

    #[test]
    fn test_empty_fresh() {
        let history = vec![make_record("1", "Bike")];
        assert!(diff(&history, &[]).is_empty());
        assert!(diff(&[], &[]).is_empty());
    }

    #[test]
    fn test_removed_items_are_ignored() {
        let history = vec![make_record("1", "Bike"), make_record("2", "Car")];
        let fresh = vec![make_record("2", "Car")];

        assert!(diff(&history, &fresh).is_empty());
    }

    #[test]
    fn test_is_pure() {
        let history = vec![make_record("1", "Bike")];
        let fresh = vec![make_record("1", "Bike"), make_record("2", "Car")];

        assert_eq!(diff(&history, &fresh), diff(&history, &fresh));
    }
}
