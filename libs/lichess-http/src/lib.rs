#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Rate-governed HTTP executor for the lichess API
//!
//! This crate provides the request plumbing shared by every lichess endpoint:
//! - A process-wide token bucket gating all outbound calls ([`RateGovernor`])
//! - Cancellation threaded through limiter admission and network dispatch
//! - Response classification into success, API error or rate-limit error
//! - **Shape-driven decoding**: a single JSON document or an NDJSON stream,
//!   selected by the destination type ([`Destination`])
//! - A cursor pager turning a paged NDJSON endpoint into one lazy,
//!   backpressured [`PagedStream`]
//!
//! The transport is a hyper + rustls stack with timeouts, default headers and
//! transparent decompression. Any `tower::Service` with the same request and
//! response types can be injected instead.
//!
//! # Example
//!
//! ```ignore
//! use lichess_http::{Executor, RequestDescriptor};
//! use tokio_util::sync::CancellationToken;
//!
//! let executor = Executor::builder().api_token("lip_xxx").build()?;
//! let cancel = CancellationToken::new();
//!
//! // Single JSON document
//! let mut user: Option<serde_json::Value> = None;
//! executor
//!     .execute(&cancel, RequestDescriptor::get("api/user/thibault"), &mut user)
//!     .await?;
//!
//! // NDJSON stream, one element per line
//! let mut games: Vec<serde_json::Value> = Vec::new();
//! executor
//!     .execute(&cancel, RequestDescriptor::get("api/games/user/thibault"), &mut games)
//!     .await?;
//! ```

mod builder;
mod classify;
mod config;
mod decode;
mod error;
mod executor;
mod layers;
mod limiter;
mod pager;
mod request;
mod response;
mod tls;

pub use builder::{ExecutorBuilder, TransportService};
pub use classify::classify;
pub use config::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT, MEDIA_TYPE_JSON, MEDIA_TYPE_NDJSON,
    RateLimitConfig, TlsRootConfig, TransportSecurity,
};
pub use decode::{DecodeError, Destination, Discard, Shape, decode};
pub use error::{ClientError, InvalidUriKind, StatusError};
pub use executor::Executor;
pub use layers::{DefaultHeadersLayer, DefaultHeadersService};
pub use limiter::RateGovernor;
pub use pager::{CursorKey, DEFAULT_PAGE_SIZE, PageCursor, PagedStream, PagerConfig};
pub use request::RequestDescriptor;
pub use response::{RawResponse, ResponseBody, ResponseMeta, full_body, parse_retry_after};
