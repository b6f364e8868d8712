use crate::api::ApiClient;
use crate::session::SessionStore;
use crate::validation::{validate_username, UsernameError};

const UPDATE_FAILED: &str = "Failed to update username";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Invalid(#[from] UsernameError),

    #[error("{0}")]
    Rejected(String),
}

/// The account settings form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsView {
    pub username: String,
    pub error: Option<String>,
    pub success: bool,
    pub submitting: bool,
}

impl SettingsView {
    /// Pre-filled with the signed-in username.
    pub fn new(session: &SessionStore) -> Self {
        Self {
            username: session.state().username.unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn set_username(&mut self, value: impl Into<String>) {
        self.username = value.into();
        self.error = None;
        self.success = false;
    }

    /// Validate, send the new username and refresh the session on success.
    /// Nothing is sent when validation fails.
    pub async fn submit(
        &mut self,
        api: &ApiClient,
        session: &SessionStore,
    ) -> Result<(), SettingsError> {
        self.error = None;
        self.success = false;
        if let Err(e) = validate_username(&self.username) {
            self.error = Some(e.message());
            return Err(e.into());
        }

        self.submitting = true;
        let response = api.update_username(&self.username).await;
        self.submitting = false;

        if !response.success {
            let message = response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UPDATE_FAILED.to_string());
            self.error = Some(message.clone());
            return Err(SettingsError::Rejected(message));
        }

        self.success = true;
        if let Err(e) = session.refresh_profile().await {
            tracing::warn!("Username saved but profile refresh failed: {}", e);
        }
        Ok(())
    }

    pub async fn logout(&mut self, session: &SessionStore) {
        session.logout().await;
        *self = Self::default();
    }
}
