//! Login and session handling
//!
//! The token is issued by the server; the client only stores and clears it.

use rollcall_common::api::{LoginRequest, Teacher, TokenResponse};
use rollcall_common::events::DashboardEvent;
use tracing::info;

use crate::error::ClientError;
use crate::Dashboard;

impl Dashboard {
    /// Exchange credentials for a bearer token and store it
    ///
    /// A 401 here means wrong credentials and is returned as an API error
    /// rather than ending a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let token: TokenResponse = self
            .client
            .post_unauthenticated("auth/login", &request)
            .await?;
        self.client.tokens().save(&token.access_token)?;

        info!(email = %request.email, "Logged in");
        Ok(())
    }

    /// Forget the stored token
    pub fn logout(&self) -> Result<(), ClientError> {
        self.client.tokens().clear()?;
        self.store.events().emit_lossy(DashboardEvent::LoggedOut);
        info!("Logged out");
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.tokens().load().is_some()
    }

    /// Profile of the logged-in teacher
    pub async fn current_teacher(&self) -> Result<Teacher, ClientError> {
        self.client.get("auth/me").await
    }
}
