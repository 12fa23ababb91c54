//! # Rollcall Common Library
//!
//! Shared code for the Rollcall attendance dashboard:
//! - API request/response types for the attendance backend
//! - Dashboard event types (DashboardEvent enum) and EventBus
//! - Configuration loading
//! - Persisted bearer token storage
//! - Date helpers

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod time;
pub mod token;

pub use error::{Error, Result};
