//! Attendance marking: single, bulk (selection) and class-wide
//!
//! Every path sends the change first and updates the local status map only
//! for what the server confirmed. A failure leaves earlier confirmed statuses
//! in place and is reported through the notifier.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, warn};

use rollcall_common::api::{
    AttendanceStatus, BulkMarkRequest, BulkMarkResponse, MarkAttendanceRequest, MarkStatus,
    Student,
};

use crate::error::ClientError;
use crate::notify::AlertLevel;
use crate::Dashboard;

/// Which requested students the server confirmed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attribution {
    /// Confirmed; safe to apply locally
    pub applied: Vec<i64>,
    /// Reported as failed
    pub failed: Vec<i64>,
    /// Outcome unknown: the server reported a count below the request size
    /// without saying which students succeeded
    pub unattributed: Vec<i64>,
}

/// Decide which students a bulk-mark response confirms
///
/// Per-student `results` are trusted when present; requested ids missing from
/// them count as failed. Without results, only a `successful` count covering
/// the whole request confirms anything.
pub fn attribute_bulk_result(requested: &[i64], response: &BulkMarkResponse) -> Attribution {
    if !response.results.is_empty() {
        let succeeded: BTreeSet<i64> = response
            .results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.student_id)
            .collect();
        let (applied, failed) = requested.iter().partition(|id| succeeded.contains(*id));
        return Attribution {
            applied,
            failed,
            unattributed: Vec::new(),
        };
    }

    if response.successful >= requested.len() {
        Attribution {
            applied: requested.to_vec(),
            ..Default::default()
        }
    } else {
        Attribution {
            unattributed: requested.to_vec(),
            ..Default::default()
        }
    }
}

/// Result of one bulk request
#[derive(Debug, Clone, PartialEq)]
pub struct BulkReport {
    pub status: MarkStatus,
    pub requested: usize,
    pub successful: usize,
    pub attribution: Attribution,
}

/// Outcome of a bulk mark started from the selection
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    NothingSelected,
    /// User declined the confirmation
    Declined,
    Completed(BulkReport),
}

/// Transient change-set behind the class-wide marking modal
///
/// Choices are buffered here and nothing is sent until
/// [`Dashboard::save_class_session`].
#[derive(Debug, Clone)]
pub struct ClassMarkSession {
    class_key: String,
    class_id: i64,
    date: NaiveDate,
    members: Vec<Student>,
    current: HashMap<i64, AttendanceStatus>,
    changes: BTreeMap<i64, MarkStatus>,
}

impl ClassMarkSession {
    pub fn class_key(&self) -> &str {
        &self.class_key
    }

    pub fn class_id(&self) -> i64 {
        self.class_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn members(&self) -> &[Student] {
        &self.members
    }

    /// Buffer a choice for one member; false if the student is not in the class
    pub fn set(&mut self, student_id: i64, status: MarkStatus) -> bool {
        if !self.members.iter().any(|s| s.student_id == student_id) {
            return false;
        }
        self.changes.insert(student_id, status);
        true
    }

    /// "Mark all present/absent" shortcut
    pub fn mark_all(&mut self, status: MarkStatus) {
        for student in &self.members {
            self.changes.insert(student.student_id, status);
        }
    }

    /// Drop a buffered choice
    pub fn reset(&mut self, student_id: i64) {
        self.changes.remove(&student_id);
    }

    pub fn pending(&self) -> &BTreeMap<i64, MarkStatus> {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Status shown in the modal: buffered choice, else the confirmed status
    pub fn displayed_status(&self, student_id: i64) -> AttendanceStatus {
        self.changes
            .get(&student_id)
            .map(|s| AttendanceStatus::from(*s))
            .or_else(|| self.current.get(&student_id).copied())
            .unwrap_or_default()
    }

    /// Change-set split by target status: Present group first, then Absent;
    /// empty groups omitted
    pub fn partition(&self) -> Vec<(MarkStatus, Vec<i64>)> {
        [MarkStatus::Present, MarkStatus::Absent]
            .into_iter()
            .map(|status| {
                let ids: Vec<i64> = self
                    .changes
                    .iter()
                    .filter(|(_, s)| **s == status)
                    .map(|(id, _)| *id)
                    .collect();
                (status, ids)
            })
            .filter(|(_, ids)| !ids.is_empty())
            .collect()
    }
}

/// One status group's result when saving a class session
#[derive(Debug)]
pub struct GroupResult {
    pub status: MarkStatus,
    pub outcome: Result<BulkReport, ClientError>,
}

/// Merged result of saving a class session
#[derive(Debug, Default)]
pub struct ClassSaveReport {
    pub groups: Vec<GroupResult>,
}

impl ClassSaveReport {
    /// Students whose new status was confirmed and applied
    pub fn applied(&self) -> Vec<i64> {
        self.groups
            .iter()
            .filter_map(|g| g.outcome.as_ref().ok())
            .flat_map(|r| r.attribution.applied.iter().copied())
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.groups.iter().all(|g| {
            g.outcome
                .as_ref()
                .map(|r| r.attribution.failed.is_empty() && r.attribution.unattributed.is_empty())
                .unwrap_or(false)
        })
    }
}

impl Dashboard {
    /// Quick mark for one student on the selected date
    ///
    /// On success the status map is updated and summary statistics are
    /// refreshed. On failure the map is untouched.
    pub async fn mark_single(&self, student_id: i64, status: MarkStatus) -> Result<(), ClientError> {
        let date = self.store.selected_date().await;
        let request = MarkAttendanceRequest {
            student_id,
            class_id: self.store.class_id_for_students(&[student_id]).await,
            attendance_date: date,
            status,
        };

        if let Err(e) = self
            .client
            .post::<serde_json::Value, _>("attendance/mark", &request)
            .await
        {
            self.report_error("Failed to mark attendance", &e);
            return Err(e);
        }

        self.store.confirm_status(date, &[student_id], status.into()).await;
        info!(student_id, status = %status, "Attendance marked");

        self.refresh_summary_after_mutation().await;
        Ok(())
    }

    /// Bulk mark every selected row, after the user confirms
    ///
    /// The selection is cleared only when the request succeeds.
    pub async fn bulk_mark_selected(&self, status: MarkStatus) -> Result<BulkOutcome, ClientError> {
        let ids = self.store.selected_ids().await;
        if ids.is_empty() {
            self.notifier
                .alert(AlertLevel::Warning, "Please select at least one student");
            return Ok(BulkOutcome::NothingSelected);
        }

        let prompt = format!("Mark {} selected student(s) as {}?", ids.len(), status);
        if !self.notifier.confirm(&prompt) {
            return Ok(BulkOutcome::Declined);
        }

        let date = self.store.selected_date().await;
        let class_id = self.store.class_id_for_students(&ids).await;
        let report = self.send_bulk(&ids, status, date, class_id).await?;

        self.store.clear_selection().await;
        self.notify_bulk_result(&report);
        self.refresh_summary_after_mutation().await;
        Ok(BulkOutcome::Completed(report))
    }

    /// Open the class-wide marking modal for a class key
    ///
    /// Returns `None` when no roster student has that key.
    pub async fn open_class_session(&self, class_key: &str) -> Option<ClassMarkSession> {
        let members = self.store.class_members(class_key).await;
        if members.is_empty() {
            return None;
        }

        let statuses = self.store.attendance().await;
        let current = members
            .iter()
            .map(|s| (s.student_id, statuses.get(&s.student_id).copied().unwrap_or_default()))
            .collect();

        Some(ClassMarkSession {
            class_key: class_key.to_string(),
            class_id: self
                .store
                .class_id_for_key(class_key)
                .await
                .unwrap_or(crate::store::DEFAULT_CLASS_ID),
            date: self.store.selected_date().await,
            members,
            current,
            changes: BTreeMap::new(),
        })
    }

    /// Send a class session's change-set: one bulk request per status group
    ///
    /// A group that fails does not stop the other group. A 401 stops
    /// everything and is returned as an error.
    pub async fn save_class_session(
        &self,
        session: ClassMarkSession,
    ) -> Result<ClassSaveReport, ClientError> {
        let mut report = ClassSaveReport::default();
        if !session.has_changes() {
            self.notifier.alert(AlertLevel::Info, "No changes to save");
            return Ok(report);
        }

        for (status, ids) in session.partition() {
            match self
                .send_bulk(&ids, status, session.date, session.class_id)
                .await
            {
                Err(ClientError::Unauthorized) => return Err(ClientError::Unauthorized),
                outcome => report.groups.push(GroupResult { status, outcome }),
            }
        }

        let applied = report.applied().len();
        if report.all_succeeded() {
            self.notifier.alert(
                AlertLevel::Success,
                &format!(
                    "Attendance saved for {} student(s) in {}",
                    applied,
                    session.class_key()
                ),
            );
        } else {
            self.notifier.alert(
                AlertLevel::Warning,
                &format!(
                    "Saved {} of {} change(s) in {}; reload to check the rest",
                    applied,
                    session.pending().len(),
                    session.class_key()
                ),
            );
        }

        self.refresh_summary_after_mutation().await;
        Ok(report)
    }

    /// One bulk request; applies only confirmed students
    async fn send_bulk(
        &self,
        ids: &[i64],
        status: MarkStatus,
        date: NaiveDate,
        class_id: i64,
    ) -> Result<BulkReport, ClientError> {
        let request = BulkMarkRequest {
            student_ids: ids.to_vec(),
            status,
            date,
            class_id,
        };

        let response: BulkMarkResponse = match self
            .client
            .post("attendance/bulk-mark", &request)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.report_error("Failed to mark attendance", &e);
                return Err(e);
            }
        };

        let attribution = attribute_bulk_result(ids, &response);
        self.store
            .confirm_status(date, &attribution.applied, status.into())
            .await;

        if !attribution.unattributed.is_empty() {
            warn!(
                requested = ids.len(),
                successful = response.successful,
                "Bulk mark reported partial success without per-student results"
            );
        }
        info!(
            status = %status,
            requested = ids.len(),
            applied = attribution.applied.len(),
            "Bulk attendance marked"
        );

        Ok(BulkReport {
            status,
            requested: ids.len(),
            successful: response.successful,
            attribution,
        })
    }

    fn notify_bulk_result(&self, report: &BulkReport) {
        let a = &report.attribution;
        if a.failed.is_empty() && a.unattributed.is_empty() {
            self.notifier.alert(
                AlertLevel::Success,
                &format!("Marked {} student(s) as {}", a.applied.len(), report.status),
            );
        } else if !a.unattributed.is_empty() {
            self.notifier.alert(
                AlertLevel::Warning,
                &format!(
                    "Server marked {} of {} student(s) but did not say which; reload to see current status",
                    report.successful, report.requested
                ),
            );
        } else {
            self.notifier.alert(
                AlertLevel::Warning,
                &format!(
                    "Marked {} student(s) as {}; {} failed",
                    a.applied.len(),
                    report.status,
                    a.failed.len()
                ),
            );
        }
    }

    async fn refresh_summary_after_mutation(&self) {
        if let Err(e) = self.refresh_summary().await {
            warn!(error = %e, "Summary refresh after attendance change failed");
        }
    }
}
