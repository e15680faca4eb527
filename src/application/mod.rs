//! Application layer orchestrating order intake, payment reconciliation and fulfillment.
//!
//! [`engine::OrderEngine`] is the single entry point. Its operations are split by concern
//! across the sibling modules, each adding an `impl OrderEngine` block. The engine holds no
//! per-order state: concurrent requests coordinate only through the store's conditional writes.

pub mod admin;
pub mod config;
mod dispatch;
pub mod engine;
pub mod payments;
pub mod reaper;
