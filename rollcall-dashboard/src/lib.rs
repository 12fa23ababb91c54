//! rollcall-dashboard library - attendance dashboard client
//!
//! Keeps a local copy of a teacher's roster and the selected day's attendance,
//! renders table view models from it, and pushes attendance changes to the
//! backend. Local state only changes after the server confirms.

use std::sync::Arc;

use rollcall_common::config::DashboardConfig;
use rollcall_common::events::EventBus;
use rollcall_common::time::today;
use rollcall_common::token::TokenStore;

pub mod analytics;
pub mod auth;
pub mod client;
pub mod error;
pub mod face;
pub mod filter;
pub mod notify;
pub mod output;
pub mod pagination;
pub mod render;
pub mod store;
pub mod students;
pub mod workflow;

pub use client::{ApiClient, ApiResponse};
pub use error::ClientError;
pub use notify::{AlertLevel, ConsoleNotifier, Notifier};
pub use store::{ActiveView, Store};

/// Dashboard handle: API client, state store and front-end hooks
///
/// Constructed once by the front end and passed to whatever needs it; there
/// is no global instance.
#[derive(Clone)]
pub struct Dashboard {
    pub client: ApiClient,
    pub store: Store,
    pub notifier: Arc<dyn Notifier>,
}

impl Dashboard {
    pub fn new(client: ApiClient, store: Store, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            store,
            notifier,
        }
    }

    /// Wire up a dashboard from configuration, starting on today's date
    pub fn from_config(
        config: &DashboardConfig,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ClientError> {
        let events = Arc::new(EventBus::default());
        let client = ApiClient::new(config, tokens, notifier.clone(), events.clone())?;
        let store = Store::new(today(), config.reload_policy, events);
        Ok(Self::new(client, store, notifier))
    }

    /// Surface a failed operation to the user
    ///
    /// A 401 already redirected to login, so it gets no extra message.
    pub(crate) fn report_error(&self, context: &str, error: &ClientError) {
        if error.is_cancellation() {
            return;
        }
        tracing::warn!(error = %error, "{}", context);
        self.notifier
            .alert(AlertLevel::Error, &format!("{}: {}", context, error));
    }
}
