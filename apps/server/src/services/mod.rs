//! Business logic shared by handlers and the admin CLI.

pub mod accounts;
pub mod images;
pub mod order_flow;
