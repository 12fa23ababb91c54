//! Dashboard statistics
//!
//! Summary counters for today plus the trend, top-performer and
//! attention-needed lists shown on the dashboard.

use rollcall_common::api::{
    AttendanceStats, AttentionNeededResponse, DailyTrends, StudentPerformance,
    TopPerformersResponse,
};

use crate::error::ClientError;
use crate::Dashboard;

/// Default trend window in days
pub const DEFAULT_TREND_DAYS: u32 = 30;

/// Default length of the top-performers list
pub const DEFAULT_TOP_LIMIT: u32 = 10;

impl Dashboard {
    /// Refresh today's summary counters into the store
    pub async fn refresh_summary(&self) -> Result<AttendanceStats, ClientError> {
        let stats: AttendanceStats = self.client.get("analytics/attendance-stats").await?;
        self.store.set_summary(stats.clone()).await;
        tracing::debug!(
            present = stats.present_today,
            absent = stats.absent_today,
            "Summary refreshed"
        );
        Ok(stats)
    }

    /// Daily attendance trend over the last `days` days
    pub async fn trends(&self, days: u32, class_id: Option<i64>) -> Result<DailyTrends, ClientError> {
        let mut endpoint = format!("analytics/trends?days={}", days.max(1));
        if let Some(id) = class_id {
            endpoint.push_str(&format!("&class_id={}", id));
        }
        self.client.get(&endpoint).await.inspect_err(|e| {
            self.report_error("Failed to load trends", e);
        })
    }

    pub async fn top_performers(
        &self,
        limit: u32,
        class_id: Option<i64>,
    ) -> Result<Vec<StudentPerformance>, ClientError> {
        let mut endpoint = format!("analytics/top-performers?limit={}", limit.max(1));
        if let Some(id) = class_id {
            endpoint.push_str(&format!("&class_id={}", id));
        }
        self.client
            .get::<TopPerformersResponse>(&endpoint)
            .await
            .map(|r| r.top_performers)
            .inspect_err(|e| self.report_error("Failed to load top performers", e))
    }

    /// Students whose attendance percentage is below `threshold`
    pub async fn attention_needed(
        &self,
        threshold: f64,
        class_id: Option<i64>,
    ) -> Result<Vec<StudentPerformance>, ClientError> {
        let mut endpoint = format!("analytics/attention-needed?threshold={}", threshold);
        if let Some(id) = class_id {
            endpoint.push_str(&format!("&class_id={}", id));
        }
        self.client
            .get::<AttentionNeededResponse>(&endpoint)
            .await
            .map(|r| r.students_needing_attention)
            .inspect_err(|e| self.report_error("Failed to load attention list", e))
    }
}

/// Present percentage from raw counts, rounded to two decimals
pub fn attendance_percentage(present: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = present as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(attendance_percentage(2, 3), 66.67);
        assert_eq!(attendance_percentage(0, 0), 0.0);
        assert_eq!(attendance_percentage(5, 5), 100.0);
    }
}
