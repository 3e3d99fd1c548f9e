// 🔍 Duplicate Resolver - group patients sharing a composite key
// Exact matching only: same Name, Email, PhoneNo and AadharNo text.

use crate::record::{parse_serial, Record, Table};
use crate::schema::Column;
use crate::view::SelectionSet;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

// ============================================================================
// DUPLICATE GROUP
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// Shared key values, in key column order
    pub key: Vec<String>,

    /// Members ordered by (Name, SerialNo)
    pub rows: Vec<Record>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn serials(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.serial_no.as_str()).collect()
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct DuplicateResolver {
    pub key_columns: Vec<Column>,
}

impl DuplicateResolver {
    /// Resolver over the standard patient key
    pub fn new() -> Self {
        Self::with_key(Column::DUPLICATE_KEY.to_vec())
    }

    pub fn with_key(key_columns: Vec<Column>) -> Self {
        DuplicateResolver { key_columns }
    }

    pub fn find_groups(&self, table: &Table) -> Vec<DuplicateGroup> {
        find_groups(table, &self.key_columns)
    }

    /// All rows that belong to some group, ordered by (Name, SerialNo)
    /// across groups
    pub fn duplicate_rows(&self, table: &Table) -> Vec<Record> {
        flatten_groups(self.find_groups(table))
    }
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Partition rows by exact key tuple, keeping groups of two or more.
/// Rows whose key columns are all blank never group.
pub fn find_groups(table: &Table, key_columns: &[Column]) -> Vec<DuplicateGroup> {
    let mut order: Vec<Vec<String>> = Vec::new();
    let mut buckets: HashMap<Vec<String>, Vec<Record>> = HashMap::new();

    for record in table.iter().filter(|r| !r.has_blank_key(key_columns)) {
        let key: Vec<String> = key_columns
            .iter()
            .map(|c| record.get(*c).to_string())
            .collect();

        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(record.clone());
    }

    let mut groups: Vec<DuplicateGroup> = order
        .into_iter()
        .filter_map(|key| {
            let mut rows = buckets.remove(&key)?;
            if rows.len() < 2 {
                return None;
            }
            rows.sort_by(display_order);
            Some(DuplicateGroup { key, rows })
        })
        .collect();

    groups.sort_by(|a, b| match (a.rows.first(), b.rows.first()) {
        (Some(x), Some(y)) => display_order(x, y),
        _ => Ordering::Equal,
    });
    groups
}

fn flatten_groups(groups: Vec<DuplicateGroup>) -> Vec<Record> {
    let mut rows: Vec<Record> = groups.into_iter().flat_map(|g| g.rows).collect();
    rows.sort_by(display_order);
    rows
}

/// (Name, SerialNo) ascending; serials compare numerically when both parse
fn display_order(a: &Record, b: &Record) -> Ordering {
    a.name.cmp(&b.name).then_with(|| {
        match (parse_serial(&a.serial_no), parse_serial(&b.serial_no)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.serial_no.cmp(&b.serial_no),
        }
    })
}

// ============================================================================
// REVIEW SESSION
// ============================================================================

/// Working state of one duplicate review: which rows are checked and which
/// were marked "not a duplicate". Hiding is display-only; nothing is stored.
pub struct DuplicateReview {
    groups: Vec<DuplicateGroup>,
    rows: Vec<Record>,
    hidden: HashSet<String>,
    selection: SelectionSet,
}

impl DuplicateReview {
    pub fn new(resolver: &DuplicateResolver, table: &Table) -> Self {
        let groups = resolver.find_groups(table);
        let rows = flatten_groups(groups.clone());
        let serials: Vec<String> = rows.iter().map(|r| r.serial_no.clone()).collect();

        Self {
            groups,
            rows,
            hidden: HashSet::new(),
            selection: SelectionSet::new(Uuid::new_v4(), serials),
        }
    }

    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    /// Rows still on screen, in display order
    pub fn visible_rows(&self) -> Vec<&Record> {
        self.rows
            .iter()
            .filter(|r| !self.hidden.contains(&r.serial_no))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.visible_rows().is_empty()
    }

    /// Suppress the checked rows for this session. Returns how many were hidden.
    pub fn hide_checked(&mut self) -> usize {
        let checked = self.selection.checked_ids();
        for serial in &checked {
            self.selection.remove(serial);
            self.hidden.insert(serial.clone());
        }
        checked.len()
    }

    pub fn checked_ids(&self) -> Vec<String> {
        self.selection.checked_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(serial: &str, name: &str, email: &str, phone: &str, aadhar: &str) -> Record {
        Record {
            serial_no: serial.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone_no: phone.to_string(),
            aadhar_no: aadhar.to_string(),
            gender: "Male".to_string(),
            age: "30".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pair_grouped_and_stranger_excluded() {
        let table: Table = vec![
            create_test_record("1", "A", "a@x", "1", ""),
            create_test_record("2", "A", "a@x", "1", ""),
            create_test_record("3", "B", "b@y", "2", "99"),
        ]
        .into_iter()
        .collect();

        let groups = DuplicateResolver::new().find_groups(&table);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].serials(), vec!["1", "2"]);
        assert_eq!(groups[0].key, vec!["A", "a@x", "1", ""]);
    }

    #[test]
    fn test_all_blank_keys_never_group() {
        let table: Table = vec![
            create_test_record("1", "", "", "", ""),
            create_test_record("2", " ", "", "", ""),
            create_test_record("3", "", "", "", ""),
        ]
        .into_iter()
        .collect();

        assert!(DuplicateResolver::new().find_groups(&table).is_empty());
    }

    #[test]
    fn test_matching_is_exact() {
        let table: Table = vec![
            create_test_record("1", "Asha", "asha@x", "1", "5"),
            create_test_record("2", "asha", "asha@x", "1", "5"),
            create_test_record("3", "Asha", "asha@x", "1", "6"),
        ]
        .into_iter()
        .collect();

        assert!(DuplicateResolver::new().find_groups(&table).is_empty());
    }

    #[test]
    fn test_groups_ordered_by_name_then_serial() {
        let table: Table = vec![
            create_test_record("10", "Zara", "z@x", "7", ""),
            create_test_record("9", "Mohan", "m@x", "8", ""),
            create_test_record("2", "Zara", "z@x", "7", ""),
            create_test_record("11", "Mohan", "m@x", "8", ""),
            create_test_record("3", "Mohan", "m@x", "8", ""),
        ]
        .into_iter()
        .collect();

        let rows = DuplicateResolver::new().duplicate_rows(&table);
        let serials: Vec<&str> = rows.iter().map(|r| r.serial_no.as_str()).collect();
        assert_eq!(serials, vec!["3", "9", "11", "2", "10"]);
    }

    #[test]
    fn test_listing_interleaves_groups_sharing_a_name() {
        let table: Table = vec![
            create_test_record("3", "Asha", "asha@x", "1", ""),
            create_test_record("9", "Asha", "asha@x", "1", ""),
            create_test_record("5", "Asha", "asha@y", "2", ""),
            create_test_record("7", "Asha", "asha@y", "2", ""),
        ]
        .into_iter()
        .collect();

        let resolver = DuplicateResolver::new();
        assert_eq!(resolver.find_groups(&table).len(), 2);

        let rows = resolver.duplicate_rows(&table);
        let serials: Vec<&str> = rows.iter().map(|r| r.serial_no.as_str()).collect();
        assert_eq!(serials, vec!["3", "5", "7", "9"]);

        let review = DuplicateReview::new(&resolver, &table);
        let visible: Vec<&str> = review.visible_rows().iter().map(|r| r.serial_no.as_str()).collect();
        assert_eq!(visible, vec!["3", "5", "7", "9"]);
    }

    #[test]
    fn test_custom_key() {
        let table: Table = vec![
            create_test_record("1", "A", "a@x", "1", ""),
            create_test_record("2", "B", "b@x", "1", ""),
        ]
        .into_iter()
        .collect();

        let groups = DuplicateResolver::with_key(vec![Column::PhoneNo]).find_groups(&table);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_review_hides_checked_rows_only_for_session() {
        let table: Table = vec![
            create_test_record("1", "A", "a@x", "1", ""),
            create_test_record("2", "A", "a@x", "1", ""),
            create_test_record("3", "C", "c@x", "3", ""),
            create_test_record("4", "C", "c@x", "3", ""),
        ]
        .into_iter()
        .collect();

        let resolver = DuplicateResolver::new();
        let mut review = DuplicateReview::new(&resolver, &table);
        assert_eq!(review.visible_rows().len(), 4);

        review.selection_mut().toggle("1");
        review.selection_mut().toggle("2");
        assert_eq!(review.hide_checked(), 2);

        let visible: Vec<&str> = review.visible_rows().iter().map(|r| r.serial_no.as_str()).collect();
        assert_eq!(visible, vec!["3", "4"]);
        assert!(review.checked_ids().is_empty());

        // A fresh review over the same table shows everything again
        let again = DuplicateReview::new(&resolver, &table);
        assert_eq!(again.visible_rows().len(), 4);
    }
}
