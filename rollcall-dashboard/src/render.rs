//! View models for the roster and attendance-marking tables
//!
//! Renderers are pure: given a list of students (full roster or a filtered
//! subset) they rebuild every row from scratch. Front ends draw the rows.

use std::collections::{BTreeSet, HashMap};

use rollcall_common::api::{AttendanceStatus, Student};

/// Icon shown when no photo can be loaded
pub const PLACEHOLDER_ICON: &str = "user-placeholder";

/// Message for an empty roster or a filter with no matches
pub const NO_STUDENTS_MESSAGE: &str = "No students found";

/// What the photo cell currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    Placeholder,
    Image(String),
}

/// Photo cell with its fallback chain
///
/// The chain advances only when the front end reports an image-load error;
/// nothing is checked ahead of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoCell {
    candidates: Vec<String>,
    failures: usize,
}

impl PhotoCell {
    /// Build the chain for a student:
    /// - no photo: placeholder only
    /// - absolute remote URL: proxied endpoint, then the remote URL
    /// - relative reference: proxied endpoint only
    pub fn for_student(student: &Student, base_url: &str) -> Self {
        let photo = student.photo_url.as_deref().map(str::trim).unwrap_or("");
        let candidates = if photo.is_empty() {
            Vec::new()
        } else {
            let proxied = proxied_photo_url(base_url, student.student_id);
            if is_remote_url(photo) {
                vec![proxied, photo.to_string()]
            } else {
                vec![proxied]
            }
        };

        Self {
            candidates,
            failures: 0,
        }
    }

    pub fn current(&self) -> PhotoSource {
        self.candidates
            .get(self.failures)
            .map(|url| PhotoSource::Image(url.clone()))
            .unwrap_or(PhotoSource::Placeholder)
    }

    /// The current image failed to load; move to the next fallback
    pub fn on_load_error(&mut self) -> PhotoSource {
        if self.failures < self.candidates.len() {
            self.failures += 1;
        }
        self.current()
    }

    /// Whether showing this cell issues any image request at all
    pub fn requests_image(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

/// Server endpoint that streams a student's stored photo
pub fn proxied_photo_url(base_url: &str, student_id: i64) -> String {
    format!(
        "{}/face/student-photo/{}",
        base_url.trim_end_matches('/'),
        student_id
    )
}

fn is_remote_url(photo: &str) -> bool {
    let lower = photo.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

/// Table body: either rows or one explicit "no results" row
#[derive(Debug, Clone, PartialEq)]
pub enum TableBody<R> {
    Rows(Vec<R>),
    NoResults(String),
}

impl<R> TableBody<R> {
    fn from_rows(rows: Vec<R>) -> Self {
        if rows.is_empty() {
            TableBody::NoResults(NO_STUDENTS_MESSAGE.to_string())
        } else {
            TableBody::Rows(rows)
        }
    }

    /// Data rows (empty for the no-results body)
    pub fn rows(&self) -> &[R] {
        match self {
            TableBody::Rows(rows) => rows,
            TableBody::NoResults(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TableBody::NoResults(_))
    }
}

/// Roster table row (edit/delete actions)
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    pub student_id: i64,
    pub roll_number: String,
    pub name: String,
    pub class_key: String,
    pub stream: String,
    pub email: String,
    pub photo: PhotoCell,
    pub selected: bool,
}

/// Rendered roster table
#[derive(Debug, Clone, PartialEq)]
pub struct RosterView {
    pub body: TableBody<RosterRow>,
    /// Number of students displayed
    pub count: usize,
}

/// Render the roster table for `list`
pub fn display_students(
    list: &[Student],
    base_url: &str,
    selection: &BTreeSet<i64>,
) -> RosterView {
    let rows: Vec<RosterRow> = list
        .iter()
        .map(|s| RosterRow {
            student_id: s.student_id,
            roll_number: s.roll_number.clone(),
            name: s.name.clone(),
            class_key: s.class_key(),
            stream: s.stream.clone().unwrap_or_default(),
            email: s.email.clone().unwrap_or_default(),
            photo: PhotoCell::for_student(s, base_url),
            selected: selection.contains(&s.student_id),
        })
        .collect();

    RosterView {
        count: rows.len(),
        body: TableBody::from_rows(rows),
    }
}

/// Present/absent toggle pair for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusToggles {
    pub present_active: bool,
    pub absent_active: bool,
}

impl From<AttendanceStatus> for StatusToggles {
    fn from(status: AttendanceStatus) -> Self {
        Self {
            present_active: status == AttendanceStatus::Present,
            absent_active: status == AttendanceStatus::Absent,
        }
    }
}

/// Attendance-marking table row
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRow {
    pub student_id: i64,
    pub roll_number: String,
    pub name: String,
    pub class_key: String,
    pub photo: PhotoCell,
    pub status: AttendanceStatus,
    pub toggles: StatusToggles,
    pub selected: bool,
}

/// Rendered attendance-marking table with per-status tallies
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceView {
    pub body: TableBody<AttendanceRow>,
    pub count: usize,
    pub present: usize,
    pub absent: usize,
    pub not_marked: usize,
}

/// Render the attendance-marking table for `list`
///
/// Students missing from `statuses` show as not marked.
pub fn display_attendance_table(
    list: &[Student],
    statuses: &HashMap<i64, AttendanceStatus>,
    base_url: &str,
    selection: &BTreeSet<i64>,
) -> AttendanceView {
    let rows: Vec<AttendanceRow> = list
        .iter()
        .map(|s| {
            let status = statuses.get(&s.student_id).copied().unwrap_or_default();
            AttendanceRow {
                student_id: s.student_id,
                roll_number: s.roll_number.clone(),
                name: s.name.clone(),
                class_key: s.class_key(),
                photo: PhotoCell::for_student(s, base_url),
                status,
                toggles: status.into(),
                selected: selection.contains(&s.student_id),
            }
        })
        .collect();

    let tally = |wanted: AttendanceStatus| rows.iter().filter(|r| r.status == wanted).count();
    let present = tally(AttendanceStatus::Present);
    let absent = tally(AttendanceStatus::Absent);
    let not_marked = tally(AttendanceStatus::NotMarked);

    AttendanceView {
        count: rows.len(),
        present,
        absent,
        not_marked,
        body: TableBody::from_rows(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://school.test";

    fn student(id: i64, photo: Option<&str>) -> Student {
        Student {
            student_id: id,
            roll_number: format!("CS{:03}", id),
            name: format!("Student {}", id),
            class_name: "12".to_string(),
            section: Some("A".to_string()),
            stream: None,
            email: None,
            photo_url: photo.map(str::to_string),
            is_active: true,
        }
    }

    #[test]
    fn test_empty_photo_is_placeholder_without_request() {
        for photo in [None, Some(""), Some("   ")] {
            let cell = PhotoCell::for_student(&student(1, photo), BASE);
            assert_eq!(cell.current(), PhotoSource::Placeholder);
            assert!(!cell.requests_image());
        }
    }

    #[test]
    fn test_remote_photo_chain() {
        let mut cell = PhotoCell::for_student(&student(5, Some("https://cdn.test/p.jpg")), BASE);

        assert_eq!(
            cell.current(),
            PhotoSource::Image("http://school.test/face/student-photo/5".to_string())
        );
        assert_eq!(
            cell.on_load_error(),
            PhotoSource::Image("https://cdn.test/p.jpg".to_string())
        );
        assert_eq!(cell.on_load_error(), PhotoSource::Placeholder);
        // Further errors stay on the placeholder
        assert_eq!(cell.on_load_error(), PhotoSource::Placeholder);
    }

    #[test]
    fn test_relative_photo_uses_proxy_only() {
        let mut cell = PhotoCell::for_student(
            &student(9, Some("/uploads/student_photos/9.jpg")),
            "http://school.test/",
        );

        assert_eq!(cell.candidates(), ["http://school.test/face/student-photo/9"]);
        assert_eq!(cell.on_load_error(), PhotoSource::Placeholder);
    }

    #[test]
    fn test_display_students_counts_rows() {
        let list = vec![student(1, None), student(2, None), student(3, None)];
        let view = display_students(&list, BASE, &BTreeSet::new());

        assert_eq!(view.count, 3);
        assert_eq!(view.body.rows().len(), 3);
        assert_eq!(view.body.rows()[1].class_key, "12 - A");
    }

    #[test]
    fn test_display_students_empty_renders_no_results_row() {
        let view = display_students(&[], BASE, &BTreeSet::new());

        assert_eq!(view.count, 0);
        assert_eq!(view.body, TableBody::NoResults(NO_STUDENTS_MESSAGE.to_string()));
    }

    #[test]
    fn test_attendance_table_statuses_and_toggles() {
        let list = vec![student(1, None), student(2, None), student(3, None)];
        let statuses = HashMap::from([
            (1, AttendanceStatus::Present),
            (2, AttendanceStatus::Absent),
        ]);
        let selection = BTreeSet::from([2]);

        let view = display_attendance_table(&list, &statuses, BASE, &selection);
        let rows = view.body.rows();

        assert_eq!((view.present, view.absent, view.not_marked), (1, 1, 1));
        assert!(rows[0].toggles.present_active && !rows[0].toggles.absent_active);
        assert!(rows[1].selected);
        assert_eq!(rows[2].status, AttendanceStatus::NotMarked);
        assert!(!rows[2].toggles.present_active && !rows[2].toggles.absent_active);
    }
}
