//! Core entity definitions for the Asali shop backend.
//!
//! This crate defines the records persisted by the shop: users and their
//! roles, catalog products, and orders with their line-item snapshots.
//! Products and orders serialize their identifier as `_id` and every other
//! field in camelCase, which is the document shape storefront clients expect.

mod order;
mod product;
mod user;

pub use order::*;
pub use product::*;
pub use user::*;
