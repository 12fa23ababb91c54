//! Roster filtering and search
//!
//! The filtered view is recomputed from the full roster on every input change.
//! There is no debounce: filtering is a synchronous in-memory pass.

use std::collections::BTreeSet;
use std::fmt;

use rollcall_common::api::Student;

/// Filter inputs: free-text term and optional class key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterFilter {
    search: String,
    class_key: Option<String>,
}

impl RosterFilter {
    /// Blank inputs (after trimming) leave that filter unset
    pub fn new(search: impl Into<String>, class_key: Option<String>) -> Self {
        let search = search.into().trim().to_lowercase();
        let class_key = class_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self { search, class_key }
    }

    /// Normalized (lowercase) search term, empty when unset
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn class_key(&self) -> Option<&str> {
        self.class_key.as_deref()
    }

    /// Number of active filters (0, 1 or 2)
    pub fn active_count(&self) -> usize {
        usize::from(!self.search.is_empty()) + usize::from(self.class_key.is_some())
    }

    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }

    /// Class filter (exact key) AND text filter (substring on any field)
    pub fn matches(&self, student: &Student) -> bool {
        if let Some(key) = &self.class_key {
            if student.class_key() != *key {
                return false;
            }
        }
        self.search.is_empty() || text_matches(student, &self.search)
    }

    /// Filter a roster, preserving order
    pub fn apply(&self, roster: &[Student]) -> Vec<Student> {
        roster.iter().filter(|s| self.matches(s)).cloned().collect()
    }
}

fn text_matches(student: &Student, term: &str) -> bool {
    let optional = [
        student.section.as_deref(),
        student.stream.as_deref(),
        student.email.as_deref(),
    ];

    [
        student.name.as_str(),
        student.roll_number.as_str(),
        student.class_name.as_str(),
    ]
    .into_iter()
    .chain(optional.into_iter().flatten())
    .any(|field| field.to_lowercase().contains(term))
}

/// Sorted, de-duplicated class keys for the class selector
pub fn class_options(roster: &[Student]) -> Vec<String> {
    roster
        .iter()
        .map(Student::class_key)
        .filter(|k| !k.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Filter indicator text: `(N filters applied: X of Y)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub filters_applied: usize,
    pub shown: usize,
    pub total: usize,
}

impl FilterSummary {
    /// `None` when no filter is active (the indicator is cleared)
    pub fn for_filter(filter: &RosterFilter, shown: usize, total: usize) -> Option<Self> {
        filter.is_active().then_some(Self {
            filters_applied: filter.active_count(),
            shown,
            total,
        })
    }
}

impl fmt::Display for FilterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} filters applied: {} of {})",
            self.filters_applied, self.shown, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: i64, name: &str, roll: &str, class: &str, section: &str) -> Student {
        Student {
            student_id: id,
            roll_number: roll.to_string(),
            name: name.to_string(),
            class_name: class.to_string(),
            section: Some(section.to_string()),
            stream: None,
            email: None,
            photo_url: None,
            is_active: true,
        }
    }

    fn roster() -> Vec<Student> {
        let mut carol = student(3, "Carol", "EC010", "11", "A");
        carol.stream = Some("Commerce".to_string());
        carol.email = Some("carol@school.test".to_string());
        vec![
            student(1, "Alice", "CS001", "12", "A"),
            student(2, "Bob", "CS002", "12", "B"),
            carol,
        ]
    }

    fn ids(students: &[Student]) -> Vec<i64> {
        students.iter().map(|s| s.student_id).collect()
    }

    #[test]
    fn test_class_filter_exact_key() {
        let filter = RosterFilter::new("", Some("12 - A".to_string()));
        assert_eq!(ids(&filter.apply(&roster())), vec![1]);
    }

    #[test]
    fn test_class_key_is_not_prefix_match() {
        let filter = RosterFilter::new("", Some("12".to_string()));
        assert!(filter.apply(&roster()).is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let roster = roster();
        assert_eq!(ids(&RosterFilter::new("ALI", None).apply(&roster)), vec![1]);
        assert_eq!(ids(&RosterFilter::new("cs00", None).apply(&roster)), vec![1, 2]);
        assert_eq!(ids(&RosterFilter::new("commerce", None).apply(&roster)), vec![3]);
        assert_eq!(ids(&RosterFilter::new("school.test", None).apply(&roster)), vec![3]);
        assert_eq!(ids(&RosterFilter::new("11", None).apply(&roster)), vec![3]);
    }

    #[test]
    fn test_class_and_search_combine_with_and() {
        let filter = RosterFilter::new("bob", Some("12 - A".to_string()));
        assert!(filter.apply(&roster()).is_empty());

        let filter = RosterFilter::new("bob", Some("12 - B".to_string()));
        assert_eq!(ids(&filter.apply(&roster())), vec![2]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = RosterFilter::new("cs", Some("12 - B".to_string()));
        let once = filter.apply(&roster());
        let twice = filter.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_blank_inputs_are_inactive() {
        let filter = RosterFilter::new("   ", Some("  ".to_string()));
        assert!(!filter.is_active());
        assert_eq!(filter.apply(&roster()).len(), 3);
        assert_eq!(FilterSummary::for_filter(&filter, 3, 3), None);
    }

    #[test]
    fn test_summary_text() {
        let filter = RosterFilter::new("a", Some("12 - A".to_string()));
        let summary = FilterSummary::for_filter(&filter, 1, 3).unwrap();
        assert_eq!(summary.to_string(), "(2 filters applied: 1 of 3)");
    }

    #[test]
    fn test_class_options_sorted_unique() {
        let mut roster = roster();
        roster.push(student(4, "Dan", "CS004", "12", "A"));
        assert_eq!(class_options(&roster), vec!["11 - A", "12 - A", "12 - B"]);
    }
}
