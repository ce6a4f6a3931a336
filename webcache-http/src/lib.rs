//! HTTP GET fetcher for WEBCACHE.
//!
//! Fetches a page body where the fetch key is the URL.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod fetcher;

pub use fetcher::{HttpConfig, HttpFetcher};
