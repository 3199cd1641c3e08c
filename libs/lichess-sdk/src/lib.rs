#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Typed lichess API client
//!
//! Thin endpoint layer over [`lichess_http`]: each service builds a request
//! descriptor and lets the executor handle rate limiting, cancellation,
//! classification and decoding.

mod account;
mod client;
mod games;
pub mod models;
mod users;

pub use account::Account;
pub use client::Client;
pub use games::{Games, ListOptions, Sort};
pub use users::Users;

pub use lichess_http::{ClientConfig, ClientError, PageCursor, PagedStream, PagerConfig};
