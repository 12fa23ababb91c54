//! Plain-text rendering of view models for the terminal front end

use std::fmt::Write;

use rollcall_common::api::{AttendanceStats, AttendanceStatus, ClassInfo, DailyTrends, StudentPerformance};

use crate::analytics::attendance_percentage;
use crate::filter::FilterSummary;
use crate::pagination::Pagination;
use crate::render::{AttendanceView, PhotoSource, RosterView, TableBody};

fn selection_mark(selected: bool) -> &'static str {
    if selected {
        "[x]"
    } else {
        "[ ]"
    }
}

fn photo_mark(source: &PhotoSource) -> &'static str {
    match source {
        PhotoSource::Placeholder => "-",
        PhotoSource::Image(_) => "photo",
    }
}

fn status_label(status: AttendanceStatus) -> &'static str {
    match status {
        AttendanceStatus::Present => "PRESENT",
        AttendanceStatus::Absent => "ABSENT",
        AttendanceStatus::NotMarked => "-",
    }
}

fn footer(out: &mut String, count: usize, page: &Pagination, filter: Option<&FilterSummary>) {
    let _ = write!(out, "{} students", count);
    if page.total_pages > 1 {
        let _ = write!(out, " | page {}/{}", page.page, page.total_pages);
    }
    if let Some(summary) = filter {
        let _ = write!(out, " {}", summary);
    }
    out.push('\n');
}

/// Roster table, one page of it
pub fn format_roster(view: &RosterView, page: &Pagination, filter: Option<&FilterSummary>) -> String {
    let mut out = String::new();
    match &view.body {
        TableBody::NoResults(message) => {
            let _ = writeln!(out, "{}", message);
        }
        TableBody::Rows(rows) => {
            let _ = writeln!(
                out,
                "{:<3} {:>5}  {:<10} {:<24} {:<14} {:<12} {:<5}",
                "", "ID", "ROLL", "NAME", "CLASS", "STREAM", "PHOTO"
            );
            for row in page.slice(rows) {
                let _ = writeln!(
                    out,
                    "{:<3} {:>5}  {:<10} {:<24} {:<14} {:<12} {:<5}",
                    selection_mark(row.selected),
                    row.student_id,
                    row.roll_number,
                    row.name,
                    row.class_key,
                    row.stream,
                    photo_mark(&row.photo.current())
                );
            }
        }
    }
    footer(&mut out, view.count, page, filter);
    out
}

/// Attendance-marking table with tallies for the whole filtered list
pub fn format_attendance(
    view: &AttendanceView,
    date: &str,
    page: &Pagination,
    filter: Option<&FilterSummary>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Attendance for {}", date);
    match &view.body {
        TableBody::NoResults(message) => {
            let _ = writeln!(out, "{}", message);
        }
        TableBody::Rows(rows) => {
            let _ = writeln!(
                out,
                "{:<3} {:>5}  {:<10} {:<24} {:<14} {:<8}",
                "", "ID", "ROLL", "NAME", "CLASS", "STATUS"
            );
            for row in page.slice(rows) {
                let _ = writeln!(
                    out,
                    "{:<3} {:>5}  {:<10} {:<24} {:<14} {:<8}",
                    selection_mark(row.selected),
                    row.student_id,
                    row.roll_number,
                    row.name,
                    row.class_key,
                    status_label(row.status)
                );
            }
        }
    }
    let marked = (view.present + view.absent) as u64;
    let _ = writeln!(
        out,
        "Present {} | Absent {} | Not marked {} | {:.2}% of marked present",
        view.present,
        view.absent,
        view.not_marked,
        attendance_percentage(view.present as u64, marked)
    );
    footer(&mut out, view.count, page, filter);
    out
}

pub fn format_classes(classes: &[ClassInfo]) -> String {
    if classes.is_empty() {
        return "No classes assigned\n".to_string();
    }
    let mut out = String::new();
    for class in classes {
        let _ = write!(out, "{:>5}  {}", class.class_id, class.class_key());
        if let Some(subject) = &class.subject {
            let _ = write!(out, " ({})", subject);
        }
        out.push('\n');
    }
    out
}

pub fn format_stats(stats: &AttendanceStats) -> String {
    format!(
        "Total students: {}\nPresent today:  {}\nAbsent today:   {}\nAttendance:     {:.2}%\n",
        stats.total_students, stats.present_today, stats.absent_today, stats.attendance_percentage
    )
}

pub fn format_trends(trends: &DailyTrends) -> String {
    if trends.dates.is_empty() {
        return "No attendance recorded in this period\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {:>7} {:>7} {:>7} {:>8}", "DATE", "MARKED", "PRESENT", "ABSENT", "RATE");
    for (i, date) in trends.dates.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<12} {:>7} {:>7} {:>7} {:>7.2}%",
            date,
            trends.total_marked.get(i).copied().unwrap_or(0),
            trends.present_count.get(i).copied().unwrap_or(0),
            trends.absent_count.get(i).copied().unwrap_or(0),
            trends.attendance_percentage.get(i).copied().unwrap_or(0.0)
        );
    }
    out
}

/// Ranked list for top performers or students needing attention
pub fn format_performers(title: &str, students: &[StudentPerformance]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    if students.is_empty() {
        let _ = writeln!(out, "  none");
        return out;
    }
    for (rank, s) in students.iter().enumerate() {
        let _ = write!(
            out,
            "{:>3}. {:<10} {:<24} {:>3}/{:<3} {:>6.2}%",
            rank + 1,
            s.roll_number,
            s.name,
            s.present_days,
            s.total_days,
            s.attendance_percentage
        );
        if let Some(deficit) = s.deficit_percentage {
            let _ = write!(out, "  (-{:.2})", deficit);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::calculate_pagination;
    use crate::render::{display_attendance_table, display_students};
    use rollcall_common::api::Student;
    use std::collections::{BTreeSet, HashMap};

    fn student(id: i64, name: &str) -> Student {
        Student {
            student_id: id,
            roll_number: format!("CS{:03}", id),
            name: name.to_string(),
            class_name: "10".to_string(),
            section: Some("A".to_string()),
            stream: None,
            email: None,
            photo_url: None,
            is_active: true,
        }
    }

    #[test]
    fn test_empty_roster_prints_no_results_row() {
        let view = display_students(&[], "http://x", &BTreeSet::new());
        let page = calculate_pagination(0, 1, 25);
        let text = format_roster(&view, &page, None);
        assert!(text.starts_with("No students found"));
        assert!(text.contains("0 students"));
    }

    #[test]
    fn test_roster_shows_only_current_page() {
        let roster: Vec<Student> = (1..=30).map(|i| student(i, &format!("S{}", i))).collect();
        let view = display_students(&roster, "http://x", &BTreeSet::new());
        let page = calculate_pagination(view.count, 2, 25);
        let text = format_roster(&view, &page, None);

        assert!(text.contains("S26"));
        assert!(!text.contains(" S3 "));
        assert!(text.contains("30 students | page 2/2"));
    }

    #[test]
    fn test_attendance_tallies_and_filter_indicator() {
        let roster = vec![student(1, "Alice"), student(2, "Bob"), student(3, "Cara")];
        let mut statuses = HashMap::new();
        statuses.insert(1, AttendanceStatus::Present);
        statuses.insert(2, AttendanceStatus::Absent);
        let view = display_attendance_table(&roster, &statuses, "http://x", &BTreeSet::new());
        let page = calculate_pagination(view.count, 1, 25);
        let summary = FilterSummary {
            filters_applied: 1,
            shown: 3,
            total: 10,
        };

        let text = format_attendance(&view, "2024-01-15", &page, Some(&summary));
        assert!(text.contains("Present 1 | Absent 1 | Not marked 1 | 50.00%"));
        assert!(text.contains("(1 filters applied: 3 of 10)"));
        assert!(text.contains("PRESENT"));
    }

    #[test]
    fn test_trends_tolerate_ragged_series() {
        let trends = DailyTrends {
            dates: vec!["2024-01-15".to_string(), "2024-01-16".to_string()],
            total_marked: vec![10],
            present_count: vec![8],
            absent_count: vec![2],
            attendance_percentage: vec![80.0],
        };
        let text = format_trends(&trends);
        assert!(text.contains("2024-01-16"));
        assert!(text.contains("80.00%"));
    }
}
