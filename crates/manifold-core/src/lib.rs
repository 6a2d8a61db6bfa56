//! Shared core types for Manifold
//!
//! Holds the per-request context handed to every adapter call and the
//! `HttpError` contract the server layer uses to render domain errors.

#![allow(clippy::must_use_candidate)]

pub mod context;
pub mod error;

pub use context::RequestContext;
pub use error::HttpError;
