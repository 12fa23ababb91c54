//! Face-recognition attendance path
//!
//! Encoding and matching run on the server. The client uploads photos and
//! captures, and applies a recognised student's status once the server says
//! it marked them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::info;

use rollcall_common::api::{AttendanceStatus, RecognizeRequest, RecognizeResponse, RecognizedStudent};
use rollcall_common::time::today;

use crate::error::ClientError;
use crate::notify::AlertLevel;
use crate::students::read_upload;
use crate::Dashboard;

/// Image types accepted for student photos
pub const PHOTO_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Result of a recognition attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    /// Matched and marked present for today
    Recognized(RecognizedStudent),
    NotRecognized(String),
}

/// Confidence for display, e.g. `87.3%`
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence.clamp(0.0, 100.0))
}

impl Dashboard {
    /// Upload a photo used for recognition and display
    pub async fn upload_photo(&self, student_id: i64, path: &Path) -> Result<(), ClientError> {
        let (file_name, bytes) = read_upload(path, &PHOTO_EXTENSIONS)
            .await
            .inspect_err(|e| self.report_error("Failed to upload photo", e))?;

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        self.client
            .upload::<serde_json::Value>(&format!("face/upload-student-photo/{}", student_id), form)
            .await
            .inspect_err(|e| self.report_error("Failed to upload photo", e))?;

        info!(student_id, "Photo uploaded");
        self.notifier.alert(AlertLevel::Success, "Photo uploaded");
        self.reload_after_change().await
    }

    pub async fn remove_photo(&self, student_id: i64) -> Result<(), ClientError> {
        self.client
            .delete::<serde_json::Value>(&format!("face/remove-student-photo/{}", student_id))
            .await
            .inspect_err(|e| self.report_error("Failed to remove photo", e))?;

        info!(student_id, "Photo removed");
        self.notifier.alert(AlertLevel::Success, "Photo removed");
        self.reload_after_change().await
    }

    /// Submit a capture for recognition in `class_id`
    ///
    /// The server marks the match present for today, so the local map only
    /// changes when today is the selected date.
    pub async fn recognize(&self, image: &[u8], class_id: i64) -> Result<Recognition, ClientError> {
        if image.is_empty() {
            return Err(ClientError::InvalidInput("Empty image".to_string()));
        }

        let request = RecognizeRequest {
            image: STANDARD.encode(image),
            class_id,
        };
        let response: RecognizeResponse = self
            .client
            .post("face/recognize-attendance", &request)
            .await
            .inspect_err(|e| self.report_error("Recognition failed", e))?;

        match (response.success, response.student) {
            (true, Some(student)) => {
                self.store
                    .confirm_status(today(), &[student.student_id], AttendanceStatus::Present)
                    .await;
                info!(
                    student_id = student.student_id,
                    confidence = student.confidence,
                    "Student recognised"
                );
                self.notifier.alert(
                    AlertLevel::Success,
                    &format!(
                        "Attendance marked for {} ({} confidence)",
                        student.name,
                        format_confidence(student.confidence)
                    ),
                );
                Ok(Recognition::Recognized(student))
            }
            _ => {
                let message = response
                    .message
                    .unwrap_or_else(|| "Student not recognized".to_string());
                self.notifier.alert(AlertLevel::Warning, &message);
                Ok(Recognition::NotRecognized(message))
            }
        }
    }
}
