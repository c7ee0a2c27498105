//! Fetcher implementations for the cache library.

pub mod http;
pub mod memory;

pub use http::HttpFetcher;
pub use memory::MemoryFetcher;
