//! HTTP request and response definitions for the Asali shop backend.
//!
//! Request bodies are strict: unknown fields are rejected during
//! deserialization and every body implements [`Validate`] for the checks
//! serde cannot express. Response types mirror the JSON documents the
//! storefront and admin dashboard consume.

mod error;
mod pagination;
mod requests;
mod responses;
mod validation;

pub use error::*;
pub use pagination::*;
pub use requests::*;
pub use responses::*;
pub use validation::*;
