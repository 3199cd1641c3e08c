use crate::models::Game;
use lichess_http::{
    ClientError, Executor, PageCursor, PagedStream, PagerConfig, RequestDescriptor,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Export order of a user's games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Sort {
    DateAsc,
    DateDesc,
}

/// Filters of `GET api/games/user/{username}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Games played since this timestamp (ms, inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
    /// Games played until this timestamp (ms, inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<i64>,
    /// Maximum number of games; all games when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rated: Option<bool>,
    /// Comma-separated perf types, e.g. `blitz,rapid`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perf_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportQuery<'a> {
    pgn_in_json: bool,
    opening: bool,
    clocks: bool,
    #[serde(flatten)]
    options: &'a ListOptions,
}

impl<'a> ExportQuery<'a> {
    fn new(options: &'a ListOptions) -> Self {
        Self {
            pgn_in_json: true,
            opening: true,
            clocks: true,
            options,
        }
    }
}

/// Game export endpoints
#[derive(Debug, Clone, Copy)]
pub struct Games<'a> {
    executor: &'a Executor,
}

impl<'a> Games<'a> {
    pub(crate) fn new(executor: &'a Executor) -> Self {
        Self { executor }
    }

    /// One game by id, PGN included.
    ///
    /// # Errors
    ///
    /// `ClientError::Status` with 404 for an unknown id.
    pub async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<Game, ClientError> {
        let request =
            RequestDescriptor::get(format!("game/export/{id}")).query(&[("pgnInJson", true)])?;
        self.executor.fetch_one(cancel, request).await
    }

    /// Games of `username` matching `options`, as one NDJSON response.
    ///
    /// # Errors
    ///
    /// Executor errors; a malformed line fails the whole call.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
        username: &str,
        options: &ListOptions,
    ) -> Result<Vec<Game>, ClientError> {
        let request = RequestDescriptor::get(format!("api/games/user/{username}"))
            .query(&ExportQuery::new(options))?;
        self.executor.fetch_all(cancel, request).await
    }

    /// Every game of `username`, oldest first, fetched page by page.
    pub fn all(&self, cancel: &CancellationToken, username: &str) -> PagedStream<Game> {
        self.all_with(cancel, username, PagerConfig::default())
    }

    /// [`Games::all`] with an explicit page size and starting timestamp.
    ///
    /// Pages are requested in ascending date order starting just after the
    /// previous page's last `createdAt`, so no game is delivered twice.
    pub fn all_with(
        &self,
        cancel: &CancellationToken,
        username: &str,
        config: PagerConfig,
    ) -> PagedStream<Game> {
        let path = format!("api/games/user/{username}");
        tracing::debug!(
            username,
            page_size = config.page_size,
            since = %config.start,
            "exporting games"
        );

        let mut first_request = true;
        self.executor.paginate(cancel, config, move |cursor: PageCursor, max| {
            // `since` is inclusive: later pages start just after the last game seen
            let since = if first_request {
                first_request = false;
                cursor.value()
            } else {
                cursor.value().saturating_add(1)
            };
            let options = ListOptions {
                since: Some(since),
                max: Some(max),
                sort: Some(Sort::DateAsc),
                ..ListOptions::default()
            };
            RequestDescriptor::get(path.clone()).query(&ExportQuery::new(&options))
        })
    }
}
