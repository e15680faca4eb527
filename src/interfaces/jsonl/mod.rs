//! Newline-delimited JSON batch interface: one request per input line, one response per
//! output line.

pub mod batch;
pub mod request_reader;
pub mod response_writer;
