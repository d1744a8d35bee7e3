//! # Transport Module
//!
//! HTTP collaborators of the relay pipeline.
//!
//! This module handles:
//! - Fetching the status document from the source endpoint (GET)
//! - Delivering encoded events to the collector (POST, JSON)
//! - Bounding every request with a timeout
//! - Classifying non-2xx responses as failures
//!
//! Both sides sit behind traits so the relay loop can be driven by mocks.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub use self::http::{HttpSink, HttpSource};

/// Where status documents come from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch one raw status document
    async fn fetch(&self) -> Result<Bytes>;
}

/// Where encoded events go
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one event payload; `Ok` only for a 2xx answer
    async fn deliver(&self, payload: Bytes) -> Result<()>;
}
