//! Cursor pagination as a single lazy stream
//!
//! A paged NDJSON resource is walked by one background producer task per
//! stream. Each page is requested, classified and decoded in full before the
//! next one is requested, so the cursor for page `n + 1` always comes from the
//! last item of page `n`.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use lichess_http::{PagerConfig, RequestDescriptor};
//!
//! let mut games = executor.paginate(&cancel, PagerConfig::default(), |cursor, max| {
//!     RequestDescriptor::get("api/games/user/thibault")
//!         .query(&[("since", cursor.value().to_string()), ("max", max.to_string())])
//! });
//!
//! while let Some(game) = games.next().await {
//!     let game: Game = game?;
//!     println!("{}", game.id);
//! }
//! ```

use crate::error::ClientError;
use crate::executor::Executor;
use crate::request::RequestDescriptor;
use futures_core::Stream;
use serde::de::DeserializeOwned;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Ordering key used to request the next page (a creation timestamp in milliseconds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageCursor(i64);

impl PageCursor {
    /// Epoch: the beginning of every collection
    pub const START: Self = Self(0);

    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_start(self) -> bool {
        self.0 == Self::START.0
    }
}

impl From<i64> for PageCursor {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Items of a paged resource expose the key the next page starts from.
pub trait CursorKey {
    fn cursor_key(&self) -> PageCursor;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagerConfig {
    /// Maximum items per page; also the stream's buffer capacity. Clamped to at least 1.
    pub page_size: usize,
    /// Cursor of the first request
    pub start: PageCursor,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            start: PageCursor::START,
        }
    }
}

impl PagerConfig {
    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn starting_at(mut self, cursor: PageCursor) -> Self {
        self.start = cursor;
        self
    }
}

/// Producer-owned progress of one stream
#[derive(Debug)]
struct StreamState {
    cursor: PageCursor,
    page_size: usize,
    done: bool,
}

/// Lazily produced items of a paged resource, in page order.
///
/// Yields `Ok(item)` for every item of every page, then ends. If a page
/// fails, the error is the last element; a cancelled stream ends with
/// [`ClientError::Canceled`] after the items already buffered. Dropping the
/// stream stops the producer at its next suspension point.
pub struct PagedStream<T> {
    items: ReceiverStream<Result<T, ClientError>>,
    _producer: DropGuard,
}

impl<T> Stream for PagedStream<T> {
    type Item = Result<T, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().items).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T> fmt::Debug for PagedStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedStream").finish_non_exhaustive()
    }
}

impl Executor {
    /// Walk a cursor-paged NDJSON resource as one stream.
    ///
    /// `next_page` builds the request for a given cursor and page size. The
    /// producer task stops when a page comes back shorter than the page size,
    /// when a request fails, when `cancel` fires, or when the stream is dropped.
    ///
    /// Must be called within a Tokio runtime.
    pub fn paginate<T, F>(
        &self,
        cancel: &CancellationToken,
        config: PagerConfig,
        next_page: F,
    ) -> PagedStream<T>
    where
        T: DeserializeOwned + CursorKey + Send + 'static,
        F: FnMut(PageCursor, usize) -> Result<RequestDescriptor, ClientError> + Send + 'static,
    {
        let page_size = config.page_size.max(1);
        let (tx, rx) = mpsc::channel(page_size);
        let token = cancel.child_token();

        let state = StreamState {
            cursor: config.start,
            page_size,
            done: false,
        };
        tokio::spawn(produce(self.clone(), token.clone(), state, next_page, tx));

        PagedStream {
            items: ReceiverStream::new(rx),
            _producer: token.drop_guard(),
        }
    }
}

async fn produce<T, F>(
    executor: Executor,
    cancel: CancellationToken,
    mut state: StreamState,
    mut next_page: F,
    tx: mpsc::Sender<Result<T, ClientError>>,
) where
    T: DeserializeOwned + CursorKey + Send + 'static,
    F: FnMut(PageCursor, usize) -> Result<RequestDescriptor, ClientError> + Send + 'static,
{
    let mut pages = 0usize;

    while !state.done {
        let fetched = match next_page(state.cursor, state.page_size) {
            Ok(request) => executor.fetch_all::<T>(&cancel, request).await,
            Err(err) => Err(err),
        };
        let page = match fetched {
            Ok(page) => page,
            Err(err) => {
                tracing::debug!(cursor = %state.cursor, pages, error = %err, "page request failed");
                publish_error(&tx, err).await;
                return;
            }
        };

        pages += 1;
        let items = page.len();
        let last = page.last().map(CursorKey::cursor_key);
        tracing::debug!(cursor = %state.cursor, items, "page fetched");

        for item in page {
            match publish(&cancel, &tx, item).await {
                Publish::Sent => {}
                Publish::Canceled => {
                    tracing::debug!(pages, "pagination cancelled");
                    publish_error(&tx, ClientError::Canceled).await;
                    return;
                }
                Publish::Closed => {
                    tracing::debug!(pages, "consumer gone; stopping pagination");
                    return;
                }
            }
        }

        match last {
            Some(next) if items >= state.page_size => {
                if next < state.cursor {
                    tracing::warn!(
                        cursor = %state.cursor,
                        next = %next,
                        "page cursor moved backwards"
                    );
                }
                state.cursor = next;
            }
            _ => state.done = true,
        }
    }

    tracing::debug!(pages, "pagination complete");
}

/// Outcome of handing one item to the consumer
enum Publish {
    Sent,
    Canceled,
    Closed,
}

/// Hand one item to the consumer, giving up if the stream is cancelled first.
async fn publish<T>(
    cancel: &CancellationToken,
    tx: &mpsc::Sender<Result<T, ClientError>>,
    item: T,
) -> Publish {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Publish::Canceled,
        sent = tx.send(Ok(item)) => match sent {
            Ok(()) => Publish::Sent,
            Err(_) => Publish::Closed,
        },
    }
}

/// Publish the terminal error, waiting for buffer room. A no-op once the stream is dropped.
async fn publish_error<T>(tx: &mpsc::Sender<Result<T, ClientError>>, err: ClientError) {
    if tx.send(Err(err)).await.is_err() {
        tracing::debug!("consumer gone before the terminal error was delivered");
    }
}
