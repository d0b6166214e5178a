//! # Squeeze Core
//!
//! Core types, traits, and error handling shared by the squeeze crates.
//!
//! This crate provides the host-side abstractions the compression middleware
//! plugs into:
//! - Streaming body type and helpers
//! - Middleware trait and `Next` continuation
//! - Request head captured for middleware decisions
//! - Error types

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod body;
pub mod error;
pub mod middleware;
pub mod request;
pub mod response;

pub use body::Body;
pub use error::{Error, Result};
pub use middleware::{Middleware, Next};
pub use request::RequestHead;
pub use response::ResponseBuilder;

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{Method, Request, Response, StatusCode};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::body::{self, Body};
    pub use crate::error::{Error, Result};
    pub use crate::middleware::{Middleware, Next};
    pub use crate::request::RequestHead;
    pub use crate::response::ResponseBuilder;
}
