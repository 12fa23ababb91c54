//! Student management: create, edit, soft delete, recover, bulk import
//!
//! Each successful change reloads the roster so every view redraws from the
//! server's copy.

use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::info;

use rollcall_common::api::{
    DeleteStudentResponse, FileUploadResponse, RecoverStudentResponse, Student, StudentCreate,
    StudentUpdate,
};

use crate::error::ClientError;
use crate::notify::AlertLevel;
use crate::Dashboard;

/// File extensions the import endpoint accepts
pub const IMPORT_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Outcome of an operation that asks for confirmation first
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmed<T> {
    Done(T),
    Declined,
}

impl Dashboard {
    pub async fn create_student(&self, student: StudentCreate) -> Result<Student, ClientError> {
        if student.roll_number.trim().is_empty() || student.name.trim().is_empty() {
            let e = ClientError::InvalidInput("Roll number and name are required".to_string());
            self.report_error("Failed to add student", &e);
            return Err(e);
        }

        let created: Student = self
            .client
            .post("students", &student)
            .await
            .inspect_err(|e| self.report_error("Failed to add student", e))?;

        info!(student_id = created.student_id, roll_number = %created.roll_number, "Student created");
        self.notifier
            .alert(AlertLevel::Success, &format!("Added {}", created.name));
        self.reload_after_change().await?;
        Ok(created)
    }

    pub async fn update_student(
        &self,
        student_id: i64,
        update: StudentUpdate,
    ) -> Result<Student, ClientError> {
        if update.is_empty() {
            return Err(ClientError::InvalidInput("Nothing to update".to_string()));
        }

        let updated: Student = self
            .client
            .put(&format!("students/{}", student_id), &update)
            .await
            .inspect_err(|e| self.report_error("Failed to update student", e))?;

        info!(student_id, "Student updated");
        self.notifier
            .alert(AlertLevel::Success, &format!("Updated {}", updated.name));
        self.reload_after_change().await?;
        Ok(updated)
    }

    /// Soft delete (deactivate) after confirmation; recoverable later
    pub async fn delete_student(
        &self,
        student_id: i64,
    ) -> Result<Confirmed<DeleteStudentResponse>, ClientError> {
        let label = self
            .store
            .student(student_id)
            .await
            .map(|s| format!("{} ({})", s.name, s.roll_number))
            .unwrap_or_else(|| format!("student {}", student_id));

        if !self
            .notifier
            .confirm(&format!("Delete {}? The record can be recovered later.", label))
        {
            return Ok(Confirmed::Declined);
        }

        let response: DeleteStudentResponse = self
            .client
            .delete(&format!("students/{}", student_id))
            .await
            .inspect_err(|e| self.report_error("Failed to delete student", e))?;

        info!(student_id, recovery_available = response.recovery_available, "Student deactivated");
        self.notifier.alert(
            AlertLevel::Success,
            response.message.as_deref().unwrap_or("Student deactivated"),
        );
        self.reload_after_change().await?;
        Ok(Confirmed::Done(response))
    }

    pub async fn recover_student(&self, student_id: i64) -> Result<RecoverStudentResponse, ClientError> {
        let response: RecoverStudentResponse = self
            .client
            .post_empty(&format!("students/{}/recover", student_id))
            .await
            .inspect_err(|e| self.report_error("Failed to recover student", e))?;

        info!(student_id, "Student recovered");
        self.notifier.alert(
            AlertLevel::Success,
            response.message.as_deref().unwrap_or("Student recovered"),
        );
        self.reload_after_change().await?;
        Ok(response)
    }

    /// Upload a CSV/Excel roster for server-side import
    pub async fn import_students(&self, path: &Path) -> Result<FileUploadResponse, ClientError> {
        let (file_name, bytes) = read_upload(path, &IMPORT_EXTENSIONS)
            .await
            .inspect_err(|e| self.report_error("Failed to import students", e))?;

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let response: FileUploadResponse = self
            .client
            .upload("students/upload", form)
            .await
            .inspect_err(|e| self.report_error("Failed to import students", e))?;

        info!(
            file = %response.filename,
            imported = response.records_processed.unwrap_or(0),
            "Student import finished"
        );
        self.notifier.alert(AlertLevel::Success, &response.message);
        self.reload_after_change().await?;
        Ok(response)
    }

    pub(crate) async fn reload_after_change(&self) -> Result<(), ClientError> {
        self.load_students().await.map(|_| ())
    }
}

/// Read a file for upload after checking its extension
pub(crate) async fn read_upload(
    path: &Path,
    allowed: &[&str],
) -> Result<(String, Vec<u8>), ClientError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClientError::InvalidInput(format!("Not a file: {}", path.display())))?
        .to_string();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !allowed.contains(&extension.as_str()) {
        return Err(ClientError::InvalidInput(format!(
            "Unsupported file type for {} (expected {})",
            file_name,
            allowed.join(", ")
        )));
    }

    let bytes = tokio::fs::read(path).await?;
    Ok((file_name, bytes))
}
