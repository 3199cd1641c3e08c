use crate::models::{Preferences, User};
use lichess_http::{ClientError, Executor, RequestDescriptor};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Deserialize)]
struct EmailEnvelope {
    email: String,
}

#[derive(Deserialize)]
struct PreferencesEnvelope {
    prefs: Preferences,
}

/// Endpoints of the account owning the API token
#[derive(Debug, Clone, Copy)]
pub struct Account<'a> {
    executor: &'a Executor,
}

impl<'a> Account<'a> {
    pub(crate) fn new(executor: &'a Executor) -> Self {
        Self { executor }
    }

    /// # Errors
    ///
    /// `ClientError::Status` with 401 without a valid token.
    pub async fn profile(&self, cancel: &CancellationToken) -> Result<User, ClientError> {
        self.executor
            .fetch_one(cancel, RequestDescriptor::get("api/account"))
            .await
    }

    /// Email address of the account. Requires the `email:read` scope.
    ///
    /// # Errors
    ///
    /// `ClientError::Status` with 401 without a suitable token.
    pub async fn email(&self, cancel: &CancellationToken) -> Result<String, ClientError> {
        let envelope: EmailEnvelope = self
            .executor
            .fetch_one(cancel, RequestDescriptor::get("api/account/email"))
            .await?;
        Ok(envelope.email)
    }

    /// Requires the `preference:read` scope.
    ///
    /// # Errors
    ///
    /// `ClientError::Status` with 401 without a suitable token.
    pub async fn preferences(&self, cancel: &CancellationToken) -> Result<Preferences, ClientError> {
        let envelope: PreferencesEnvelope = self
            .executor
            .fetch_one(cancel, RequestDescriptor::get("api/account/preferences"))
            .await?;
        Ok(envelope.prefs)
    }
}
