//! User, catalog and order storage for the Asali shop backend.
//!
//! This crate provides the [`ShopStore`] abstraction with two
//! implementations: [`MemoryShopStore`] for development and tests, and
//! [`PostgresShopStore`] for deployments. Stock counters are only ever
//! changed through [`ShopStore::reserve_stock`] and
//! [`ShopStore::restore_stock`], both of which are atomic per product, or
//! set explicitly through [`ShopStore::patch_product`].

mod error;
mod memory;
mod postgres;
mod traits;

pub use error::*;
pub use memory::*;
pub use postgres::*;
pub use traits::*;
