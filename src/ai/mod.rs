//! Completion streaming: HTTP client, SSE decoding and aggregation

pub mod aggregator;
pub mod client;
pub mod sse;

pub use aggregator::StreamAggregator;
pub use client::{ByteStream, CompletionClient, estimate_tokens};
