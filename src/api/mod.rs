//! HTTP JSON API
//!
//! Route handlers for the education platform: per-entity CRUD trees
//! under `/api`, the diagnostics/statistics endpoints, and the semantic
//! search pipeline. Response shapes follow the contract the frontend
//! already speaks: list endpoints answer plain arrays of flattened
//! rows, mutations answer `{"message", "uri"}`, failures answer
//! `{"error"}` / `{"errors"}` with the matching status code.

pub mod entities;
pub mod error;
pub mod meta;
pub mod search;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{create_router, ApiServer, AppState};
