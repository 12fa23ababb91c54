//! Local state store
//!
//! Single source of truth for every view: the roster, the status map for the
//! selected date, the row selection, and the filter. Lock guards are never
//! held across a network call; views read snapshots.
//!
//! The roster is only ever replaced wholesale. The status map changes key by
//! key, and only after the server has confirmed a mutation.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use rollcall_common::api::{
    AttendanceRecord, AttendanceStats, AttendanceStatus, ClassInfo, Student,
};
use rollcall_common::config::ReloadPolicy;
use rollcall_common::events::{DashboardEvent, EventBus};
use rollcall_common::time::format_date;

use crate::client::LIST_PAGE_SIZE;
use crate::error::ClientError;
use crate::filter::{class_options, FilterSummary, RosterFilter};
use crate::render::{display_attendance_table, display_students, AttendanceView, RosterView};
use crate::Dashboard;

/// Class id the server assumes when none is given
pub const DEFAULT_CLASS_ID: i64 = 1;

/// Which table the dashboard is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Roster,
    Attendance,
}

#[derive(Debug)]
struct DashboardState {
    students: Vec<Student>,
    attendance: HashMap<i64, AttendanceStatus>,
    selected_date: NaiveDate,
    selection: BTreeSet<i64>,
    filter: RosterFilter,
    active_view: ActiveView,
    summary: Option<AttendanceStats>,
    classes: Vec<ClassInfo>,
    /// Generation of the roster currently held (0 = never loaded)
    applied_generation: u64,
    /// Bumped on every confirmed status change
    attendance_version: u64,
    /// Version at which each student's status was last confirmed
    confirmed_at: HashMap<i64, u64>,
}

/// Shared handle to the dashboard state
#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<DashboardState>>,
    next_generation: Arc<AtomicU64>,
    policy: ReloadPolicy,
    events: Arc<EventBus>,
}

impl Store {
    pub fn new(selected_date: NaiveDate, policy: ReloadPolicy, events: Arc<EventBus>) -> Self {
        Self {
            state: Arc::new(RwLock::new(DashboardState {
                students: Vec::new(),
                attendance: HashMap::new(),
                selected_date,
                selection: BTreeSet::new(),
                filter: RosterFilter::default(),
                active_view: ActiveView::default(),
                summary: None,
                classes: Vec::new(),
                applied_generation: 0,
                attendance_version: 0,
                confirmed_at: HashMap::new(),
            })),
            next_generation: Arc::new(AtomicU64::new(0)),
            policy,
            events,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    // ---- roster ----

    /// Reserve a generation number for a roster reload about to be issued
    pub fn begin_reload(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the roster with a reload response
    ///
    /// Under `LastResolved` every response is applied, so the last one to
    /// arrive wins. Under `LatestIssued` a response older than the roster
    /// already held is dropped. Returns whether the roster was replaced.
    pub async fn apply_roster(&self, generation: u64, students: Vec<Student>) -> bool {
        let mut state = self.state.write().await;

        if self.policy == ReloadPolicy::LatestIssued && generation < state.applied_generation {
            let applied = state.applied_generation;
            drop(state);
            debug!(generation, applied, "Discarding stale roster response");
            self.events
                .emit_lossy(DashboardEvent::StaleRosterDiscarded { generation, applied });
            return false;
        }

        let count = students.len();
        let ids: BTreeSet<i64> = students.iter().map(|s| s.student_id).collect();
        state.students = students;
        state.applied_generation = generation;
        state.selection.retain(|id| ids.contains(id));
        drop(state);

        self.events
            .emit_lossy(DashboardEvent::RosterReplaced { generation, count });
        true
    }

    /// Snapshot of the full roster
    pub async fn students(&self) -> Vec<Student> {
        self.state.read().await.students.clone()
    }

    pub async fn student(&self, student_id: i64) -> Option<Student> {
        self.state
            .read()
            .await
            .students
            .iter()
            .find(|s| s.student_id == student_id)
            .cloned()
    }

    /// Generation of the roster currently held
    pub async fn applied_generation(&self) -> u64 {
        self.state.read().await.applied_generation
    }

    /// Class selector options derived from the current roster
    pub async fn class_options(&self) -> Vec<String> {
        class_options(&self.state.read().await.students)
    }

    /// Roster members whose class key equals `class_key`
    pub async fn class_members(&self, class_key: &str) -> Vec<Student> {
        self.state
            .read()
            .await
            .students
            .iter()
            .filter(|s| s.class_key() == class_key)
            .cloned()
            .collect()
    }

    // ---- classes ----

    pub async fn set_classes(&self, classes: Vec<ClassInfo>) {
        self.state.write().await.classes = classes;
    }

    pub async fn classes(&self) -> Vec<ClassInfo> {
        self.state.read().await.classes.clone()
    }

    /// Server class id for a class key, if the class list knows it
    pub async fn class_id_for_key(&self, class_key: &str) -> Option<i64> {
        self.state
            .read()
            .await
            .classes
            .iter()
            .find(|c| c.class_key() == class_key)
            .map(|c| c.class_id)
    }

    /// Class id for a mark request covering `student_ids`
    ///
    /// When every student belongs to one known class that class's id is used;
    /// otherwise [`DEFAULT_CLASS_ID`].
    pub async fn class_id_for_students(&self, student_ids: &[i64]) -> i64 {
        let state = self.state.read().await;
        let keys: BTreeSet<String> = state
            .students
            .iter()
            .filter(|s| student_ids.contains(&s.student_id))
            .map(Student::class_key)
            .collect();

        if keys.len() != 1 {
            return DEFAULT_CLASS_ID;
        }
        keys.iter()
            .next()
            .and_then(|key| state.classes.iter().find(|c| c.class_key() == *key))
            .map(|c| c.class_id)
            .unwrap_or(DEFAULT_CLASS_ID)
    }

    // ---- attendance ----

    pub async fn selected_date(&self) -> NaiveDate {
        self.state.read().await.selected_date
    }

    /// Switch the selected date; the status map is emptied until the new
    /// date's records are loaded
    pub async fn set_date(&self, date: NaiveDate) {
        let mut state = self.state.write().await;
        if state.selected_date != date {
            state.selected_date = date;
            state.attendance.clear();
            state.confirmed_at.clear();
        }
    }

    /// Mark the start of a status-map reload
    ///
    /// Pass the returned version to [`Store::replace_attendance`] so statuses
    /// confirmed while the request was in flight survive the older snapshot.
    pub async fn begin_attendance_reload(&self) -> u64 {
        self.state.read().await.attendance_version
    }

    /// Rebuild the status map from the server's records for `date`
    ///
    /// `issued_at` comes from [`Store::begin_attendance_reload`]. Students
    /// confirmed after that point keep their local status. Ignored (returns
    /// false) when the user has since picked another date.
    pub async fn replace_attendance(
        &self,
        date: NaiveDate,
        issued_at: u64,
        records: &[AttendanceRecord],
    ) -> bool {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.selected_date != date {
            debug!(date = %format_date(date), "Dropping attendance for a date no longer selected");
            return false;
        }

        let mut map: HashMap<i64, AttendanceStatus> = state
            .students
            .iter()
            .map(|s| (s.student_id, AttendanceStatus::NotMarked))
            .collect();
        for record in records {
            map.insert(record.student_id, AttendanceStatus::from_server(&record.status));
        }

        let mut kept = 0;
        for (id, version) in &state.confirmed_at {
            if *version > issued_at {
                if let Some(status) = state.attendance.get(id) {
                    map.insert(*id, *status);
                    kept += 1;
                }
            }
        }
        if kept > 0 {
            debug!(kept, "Kept statuses confirmed after the reload was issued");
        }
        let marked = map
            .values()
            .filter(|s| **s != AttendanceStatus::NotMarked)
            .count();
        state.attendance = map;
        drop(guard);

        self.events
            .emit_lossy(DashboardEvent::AttendanceReloaded { date, marked });
        true
    }

    /// Record a server-confirmed status for `student_ids` on `date`
    ///
    /// Only call after the server acknowledged the change. Confirmations for a
    /// date other than the selected one leave the map alone.
    pub async fn confirm_status(&self, date: NaiveDate, student_ids: &[i64], status: AttendanceStatus) {
        if student_ids.is_empty() {
            return;
        }
        let mut state = self.state.write().await;
        if state.selected_date != date {
            warn!(
                date = %format_date(date),
                selected = %format_date(state.selected_date),
                "Confirmed status is for a different date, local map unchanged"
            );
            return;
        }
        state.attendance_version += 1;
        let version = state.attendance_version;
        for id in student_ids {
            state.attendance.insert(*id, status);
            state.confirmed_at.insert(*id, version);
        }
        drop(state);

        self.events.emit_lossy(DashboardEvent::AttendanceChanged {
            date,
            student_ids: student_ids.to_vec(),
            status,
        });
    }

    pub async fn status_of(&self, student_id: i64) -> AttendanceStatus {
        self.state
            .read()
            .await
            .attendance
            .get(&student_id)
            .copied()
            .unwrap_or_default()
    }

    pub async fn attendance(&self) -> HashMap<i64, AttendanceStatus> {
        self.state.read().await.attendance.clone()
    }

    // ---- selection ----

    /// Toggle a row checkbox; returns the new checked state
    pub async fn toggle_selection(&self, student_id: i64) -> bool {
        let mut state = self.state.write().await;
        if state.selection.remove(&student_id) {
            false
        } else {
            state.selection.insert(student_id);
            true
        }
    }

    /// Check the given rows (unknown ids are ignored)
    pub async fn select(&self, student_ids: &[i64]) {
        let mut state = self.state.write().await;
        let known: BTreeSet<i64> = state.students.iter().map(|s| s.student_id).collect();
        state
            .selection
            .extend(student_ids.iter().copied().filter(|id| known.contains(id)));
    }

    /// Check every row in the current filtered view
    pub async fn select_all_visible(&self) {
        let mut state = self.state.write().await;
        let visible: Vec<i64> = state
            .filter
            .apply(&state.students)
            .iter()
            .map(|s| s.student_id)
            .collect();
        state.selection.extend(visible);
    }

    pub async fn selected_ids(&self) -> Vec<i64> {
        self.state.read().await.selection.iter().copied().collect()
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selection.clear();
        self.events.emit_lossy(DashboardEvent::SelectionCleared);
    }

    // ---- filter and views ----

    /// Update filter inputs and return the new indicator
    pub async fn set_filter(&self, filter: RosterFilter) -> Option<FilterSummary> {
        let mut state = self.state.write().await;
        state.filter = filter;
        let shown = state.filter.apply(&state.students).len();
        let total = state.students.len();
        let summary = FilterSummary::for_filter(&state.filter, shown, total);
        drop(state);

        self.events
            .emit_lossy(DashboardEvent::FilterChanged { shown, total });
        summary
    }

    pub async fn filter(&self) -> RosterFilter {
        self.state.read().await.filter.clone()
    }

    /// Roster subset matching the current filter
    pub async fn filtered_students(&self) -> Vec<Student> {
        let state = self.state.read().await;
        state.filter.apply(&state.students)
    }

    pub async fn filter_summary(&self) -> Option<FilterSummary> {
        let state = self.state.read().await;
        let shown = state.filter.apply(&state.students).len();
        FilterSummary::for_filter(&state.filter, shown, state.students.len())
    }

    pub async fn set_active_view(&self, view: ActiveView) {
        self.state.write().await.active_view = view;
    }

    pub async fn active_view(&self) -> ActiveView {
        self.state.read().await.active_view
    }

    /// Roster table for the filtered roster
    pub async fn roster_view(&self, base_url: &str) -> RosterView {
        let state = self.state.read().await;
        display_students(&state.filter.apply(&state.students), base_url, &state.selection)
    }

    /// Attendance table for the filtered roster and selected date
    pub async fn attendance_view(&self, base_url: &str) -> AttendanceView {
        let state = self.state.read().await;
        display_attendance_table(
            &state.filter.apply(&state.students),
            &state.attendance,
            base_url,
            &state.selection,
        )
    }

    // ---- summary ----

    pub async fn set_summary(&self, stats: AttendanceStats) {
        self.state.write().await.summary = Some(stats);
        self.events.emit_lossy(DashboardEvent::SummaryRefreshed);
    }

    pub async fn summary(&self) -> Option<AttendanceStats> {
        self.state.read().await.summary.clone()
    }
}

impl Dashboard {
    /// Fetch the roster and replace it wholesale
    ///
    /// Overlapping reloads are not serialized; see [`Store::apply_roster`]
    /// for which response wins. Returns the number of students held after
    /// the call.
    pub async fn load_students(&self) -> Result<usize, ClientError> {
        let generation = self.store.begin_reload();
        debug!(generation, "Reloading roster");

        let students: Vec<Student> = match self.client.get_all("students", LIST_PAGE_SIZE).await {
            Ok(students) => students,
            Err(e) => {
                self.report_error("Failed to load students", &e);
                return Err(e);
            }
        };

        if self.store.apply_roster(generation, students).await {
            let count = self.store.students().await.len();
            info!(generation, count, "Roster loaded");
        }
        Ok(self.store.students().await.len())
    }

    /// Fetch the class list used to resolve class ids
    pub async fn load_classes(&self) -> Result<Vec<ClassInfo>, ClientError> {
        match self.client.get_all::<ClassInfo>("classes", LIST_PAGE_SIZE).await {
            Ok(classes) => {
                self.store.set_classes(classes.clone()).await;
                Ok(classes)
            }
            Err(e) => {
                self.report_error("Failed to load classes", &e);
                Err(e)
            }
        }
    }

    /// Load the status map for the selected date
    pub async fn load_attendance(&self) -> Result<(), ClientError> {
        let date = self.store.selected_date().await;
        let endpoint = format!("attendance/date/{}", format_date(date));
        let issued_at = self.store.begin_attendance_reload().await;

        match self.client.get::<Vec<AttendanceRecord>>(&endpoint).await {
            Ok(records) => {
                self.store.replace_attendance(date, issued_at, &records).await;
                Ok(())
            }
            Err(e) => {
                self.report_error("Failed to load attendance", &e);
                Err(e)
            }
        }
    }

    /// Change the selected date and reload its statuses
    pub async fn select_date(&self, date: NaiveDate) -> Result<(), ClientError> {
        self.store.set_date(date).await;
        self.load_attendance().await
    }

    /// Initial load: roster, classes, statuses, summary
    ///
    /// Class and summary failures are reported but do not stop the refresh.
    pub async fn refresh_all(&self) -> Result<(), ClientError> {
        self.load_students().await?;
        if let Err(e) = self.load_classes().await {
            if e.is_cancellation() {
                return Err(e);
            }
        }
        self.load_attendance().await?;
        if let Err(e) = self.refresh_summary().await {
            if e.is_cancellation() {
                return Err(e);
            }
        }
        Ok(())
    }
}
