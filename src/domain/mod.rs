//! Core order model and the rules that govern it. Nothing here performs I/O.

pub mod expiry;
pub mod intake;
pub mod lifecycle;
pub mod money;
pub mod mutation;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod signature;
