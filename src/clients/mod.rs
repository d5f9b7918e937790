//! Event source clients.

pub mod feed;

pub use feed::JsonFeedClient;
