use crate::account::Account;
use crate::games::Games;
use crate::users::Users;
use lichess_http::{ClientConfig, ClientError, Executor, ExecutorBuilder};
use std::time::Duration;

/// Entry point of the typed lichess API.
///
/// Cheap to clone; clones share the connection pool and the rate limiter.
///
/// # Example
///
/// ```rust,ignore
/// use lichess_sdk::Client;
/// use tokio_util::sync::CancellationToken;
///
/// let client = Client::new()?;
/// let cancel = CancellationToken::new();
/// let user = client.users().get(&cancel, "thibault").await?;
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    executor: Executor,
}

impl Client {
    /// Client for `https://lichess.org/` with default limits and no token.
    ///
    /// # Errors
    ///
    /// Fails only if the TLS stack cannot be set up.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::default())
    }

    /// # Errors
    ///
    /// See [`ExecutorBuilder::build`].
    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        ExecutorBuilder::with_config(config)
            .build()
            .map(Self::from_executor)
    }

    #[must_use]
    pub fn from_executor(executor: Executor) -> Self {
        Self { executor }
    }

    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    #[must_use]
    pub fn users(&self) -> Users<'_> {
        Users::new(&self.executor)
    }

    #[must_use]
    pub fn account(&self) -> Account<'_> {
        Account::new(&self.executor)
    }

    #[must_use]
    pub fn games(&self) -> Games<'_> {
        Games::new(&self.executor)
    }

    /// Replace the client-wide token bucket: one request per `interval`, bursts up to `burst`.
    ///
    /// # Errors
    ///
    /// `ClientError::InvalidRateLimit` for a zero burst or interval; the
    /// previous limits stay in force.
    pub fn set_limits(&self, interval: Duration, burst: u32) -> Result<(), ClientError> {
        self.executor.set_limits(interval, burst)
    }
}
