//! Outer adapters that move requests and reports in and out of the process.

pub mod csv;
pub mod jsonl;
