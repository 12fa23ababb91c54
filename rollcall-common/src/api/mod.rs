//! API module for the attendance backend's REST contract
//!
//! Provides the request/response types the dashboard exchanges with the server.
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Shared types (serde derive)
//! - Pure helper functions on those types
//!
//! The HTTP transport lives in the dashboard crate.

pub mod types;

pub use types::{
    AttendanceRecord, AttendanceStats, AttendanceStatus, AttentionNeededResponse, BulkMarkRequest,
    BulkMarkResponse, BulkMarkResult, ClassInfo, DailyTrends, DeleteStudentResponse,
    FileUploadResponse, LoginRequest, MarkAttendanceRequest, MarkStatus, RecognizeRequest,
    RecognizeResponse, RecognizedStudent, RecoverStudentResponse, Student, StudentCreate,
    StudentPerformance, StudentUpdate, Teacher, TokenResponse, TopPerformersResponse,
};
