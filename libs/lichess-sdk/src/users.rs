use crate::models::User;
use lichess_http::{ClientError, Executor, RequestDescriptor};
use tokio_util::sync::CancellationToken;

/// Public user endpoints
#[derive(Debug, Clone, Copy)]
pub struct Users<'a> {
    executor: &'a Executor,
}

impl<'a> Users<'a> {
    pub(crate) fn new(executor: &'a Executor) -> Self {
        Self { executor }
    }

    /// Public data of `username`.
    ///
    /// # Errors
    ///
    /// `ClientError::Status` with 404 for an unknown user, plus the usual
    /// executor errors.
    pub async fn get(&self, cancel: &CancellationToken, username: &str) -> Result<User, ClientError> {
        self.executor
            .fetch_one(cancel, RequestDescriptor::get(format!("api/user/{username}")))
            .await
    }
}
