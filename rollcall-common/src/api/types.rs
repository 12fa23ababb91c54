//! Shared API request/response types
//!
//! Types exchanged with the attendance backend. Field names follow the
//! server's JSON contract; aliases accept the older spellings still emitted by
//! some endpoints (`class` for `class_name`, `branch` for `stream`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ========================================
// Roster Types
// ========================================

fn default_active() -> bool {
    true
}

/// Student record as listed by `GET /students`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Student {
    pub student_id: i64,
    #[serde(default)]
    pub roll_number: String,
    #[serde(default)]
    pub name: String,
    /// Class (grade) name, e.g. "12"
    #[serde(default, alias = "class")]
    pub class_name: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default, alias = "branch")]
    pub stream: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Empty, an absolute remote URL, or a server-relative path
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl Student {
    /// Derived grouping key: `class` or `class - section`
    ///
    /// # Examples
    ///
    /// ```
    /// use rollcall_common::api::Student;
    ///
    /// let json = r#"{"student_id": 1, "name": "Alice", "class_name": "12", "section": "A"}"#;
    /// let student: Student = serde_json::from_str(json).unwrap();
    /// assert_eq!(student.class_key(), "12 - A");
    /// ```
    pub fn class_key(&self) -> String {
        let class = self.class_name.trim();
        match self.section.as_deref().map(str::trim) {
            Some(section) if !section.is_empty() => format!("{} - {}", class, section),
            _ => class.to_string(),
        }
    }
}

/// Body for `POST /students`
#[derive(Debug, Clone, Serialize)]
pub struct StudentCreate {
    pub roll_number: String,
    pub name: String,
    pub class_name: String,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Body for `PUT /students/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize)]
pub struct StudentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl StudentUpdate {
    /// True when no field would be sent
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.class_name.is_none()
            && self.section.is_none()
            && self.branch.is_none()
            && self.is_active.is_none()
    }
}

/// Response from `DELETE /students/{id}` (soft delete)
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteStudentResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub recovery_available: bool,
}

/// Response from `POST /students/{id}/recover`
#[derive(Debug, Clone, Deserialize)]
pub struct RecoverStudentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response from `POST /students/upload`
#[derive(Debug, Clone, Deserialize)]
pub struct FileUploadResponse {
    pub filename: String,
    pub message: String,
    #[serde(default)]
    pub records_processed: Option<u64>,
}

/// Class as listed by `GET /classes`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClassInfo {
    pub class_id: i64,
    pub class_name: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default, alias = "branch")]
    pub stream: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl ClassInfo {
    /// Same key shape as [`Student::class_key`]
    pub fn class_key(&self) -> String {
        let class = self.class_name.trim();
        match self.section.as_deref().map(str::trim) {
            Some(section) if !section.is_empty() => format!("{} - {}", class, section),
            _ => class.to_string(),
        }
    }
}

// ========================================
// Attendance Types
// ========================================

/// Attendance status as tracked locally for the selected date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    #[default]
    NotMarked,
}

impl AttendanceStatus {
    /// Parse the server's status string (`Present`/`Absent`, any case)
    ///
    /// Unknown values map to `NotMarked`.
    pub fn from_server(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "present" => AttendanceStatus::Present,
            "absent" => AttendanceStatus::Absent,
            _ => AttendanceStatus::NotMarked,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::NotMarked => "not_marked",
        };
        write!(f, "{}", s)
    }
}

/// Status that can be sent to the server; serialized capitalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MarkStatus {
    Present,
    Absent,
}

impl From<MarkStatus> for AttendanceStatus {
    fn from(status: MarkStatus) -> Self {
        match status {
            MarkStatus::Present => AttendanceStatus::Present,
            MarkStatus::Absent => AttendanceStatus::Absent,
        }
    }
}

impl fmt::Display for MarkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkStatus::Present => write!(f, "Present"),
            MarkStatus::Absent => write!(f, "Absent"),
        }
    }
}

impl FromStr for MarkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Ok(MarkStatus::Present),
            "absent" | "a" => Ok(MarkStatus::Absent),
            other => Err(format!("Unknown attendance status: {}", other)),
        }
    }
}

/// Body for `POST /attendance/mark`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkAttendanceRequest {
    pub student_id: i64,
    pub class_id: i64,
    pub attendance_date: NaiveDate,
    pub status: MarkStatus,
}

/// Body for `POST /attendance/bulk-mark`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkMarkRequest {
    pub student_ids: Vec<i64>,
    pub status: MarkStatus,
    pub date: NaiveDate,
    pub class_id: i64,
}

/// Per-student outcome reported by the bulk-mark endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BulkMarkResult {
    pub student_id: i64,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl BulkMarkResult {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

/// Response from `POST /attendance/bulk-mark`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BulkMarkResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total_students: Option<usize>,
    pub successful: usize,
    /// Not every server build returns this
    #[serde(default)]
    pub results: Vec<BulkMarkResult>,
}

/// Row from `GET /attendance/date/{date}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AttendanceRecord {
    pub student_id: i64,
    pub status: String,
    #[serde(default)]
    pub class_id: Option<i64>,
    #[serde(default)]
    pub attendance_date: Option<NaiveDate>,
}

// ========================================
// Analytics Types
// ========================================

/// Response from `GET /analytics/attendance-stats`
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct AttendanceStats {
    pub total_students: u64,
    pub present_today: u64,
    pub absent_today: u64,
    pub attendance_percentage: f64,
}

/// Response from `GET /analytics/trends`, column oriented for charting
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DailyTrends {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub total_marked: Vec<u64>,
    #[serde(default)]
    pub present_count: Vec<u64>,
    #[serde(default)]
    pub absent_count: Vec<u64>,
    #[serde(default)]
    pub attendance_percentage: Vec<f64>,
}

/// Student row in top-performer and attention-needed lists
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StudentPerformance {
    pub student_id: i64,
    pub name: String,
    pub roll_number: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    pub total_days: u64,
    pub present_days: u64,
    pub attendance_percentage: f64,
    /// Only set for attention-needed entries
    #[serde(default)]
    pub deficit_percentage: Option<f64>,
}

/// Response from `GET /analytics/top-performers`
#[derive(Debug, Clone, Deserialize)]
pub struct TopPerformersResponse {
    #[serde(default)]
    pub top_performers: Vec<StudentPerformance>,
}

/// Response from `GET /analytics/attention-needed`
#[derive(Debug, Clone, Deserialize)]
pub struct AttentionNeededResponse {
    #[serde(default)]
    pub students_needing_attention: Vec<StudentPerformance>,
}

// ========================================
// Authentication Types
// ========================================

/// Body for `POST /auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response from `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Response from `GET /auth/me`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Teacher {
    pub teacher_id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
}

// ========================================
// Face Recognition Types
// ========================================

/// Body for `POST /face/recognize-attendance`
#[derive(Debug, Clone, Serialize)]
pub struct RecognizeRequest {
    /// Base64-encoded capture
    pub image: String,
    pub class_id: i64,
}

/// Matched student in a recognition response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecognizedStudent {
    pub student_id: i64,
    pub name: String,
    #[serde(default)]
    pub roll_number: Option<String>,
    /// Similarity as a percentage (0-100)
    pub confidence: f64,
}

/// Response from `POST /face/recognize-attendance`
#[derive(Debug, Clone, Deserialize)]
pub struct RecognizeResponse {
    pub success: bool,
    #[serde(default)]
    pub student: Option<RecognizedStudent>,
    #[serde(default)]
    pub attendance_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_accepts_legacy_field_names() {
        let json = r#"{"student_id": 7, "roll_number": "CS007", "name": "Gia",
                       "class": "11", "section": "B", "branch": "Science"}"#;
        let student: Student = serde_json::from_str(json).unwrap();

        assert_eq!(student.class_name, "11");
        assert_eq!(student.stream.as_deref(), Some("Science"));
        assert!(student.is_active);
        assert_eq!(student.photo_url, None);
    }

    #[test]
    fn test_class_key_without_section() {
        let json = r#"{"student_id": 1, "class_name": "10", "section": "  "}"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert_eq!(student.class_key(), "10");
    }

    #[test]
    fn test_mark_request_wire_shape() {
        let request = MarkAttendanceRequest {
            student_id: 1,
            class_id: 1,
            attendance_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            status: MarkStatus::Present,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "student_id": 1,
                "class_id": 1,
                "attendance_date": "2024-01-15",
                "status": "Present"
            })
        );
    }

    #[test]
    fn test_status_from_server_is_case_insensitive() {
        assert_eq!(AttendanceStatus::from_server("Present"), AttendanceStatus::Present);
        assert_eq!(AttendanceStatus::from_server("ABSENT"), AttendanceStatus::Absent);
        assert_eq!(AttendanceStatus::from_server("Late"), AttendanceStatus::NotMarked);
    }

    #[test]
    fn test_bulk_response_without_results() {
        let json = r#"{"message": "done", "total_students": 3, "successful": 3}"#;
        let response: BulkMarkResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.successful, 3);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_mark_status_parsing() {
        assert_eq!("present".parse::<MarkStatus>(), Ok(MarkStatus::Present));
        assert_eq!("A".parse::<MarkStatus>(), Ok(MarkStatus::Absent));
        assert!("late".parse::<MarkStatus>().is_err());
    }

    #[test]
    fn test_student_update_skips_unset_fields() {
        let update = StudentUpdate {
            name: Some("New Name".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"name": "New Name"})
        );
        assert!(StudentUpdate::default().is_empty());
    }
}
