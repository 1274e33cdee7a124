//! Authentication primitives for the Asali shop backend.
//!
//! This crate provides:
//! - JWT access token generation and validation
//! - Argon2id password hashing and verification

mod error;
mod jwt;
mod password;

pub use error::*;
pub use jwt::*;
pub use password::*;

/// Default JWT expiration time in hours (seven days).
pub const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 7 * 24;

/// Default JWT issuer.
pub const DEFAULT_JWT_ISSUER: &str = "asali";
