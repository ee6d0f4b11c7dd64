//! API middleware.
//!
//! Execution order (outermost → innermost):
//! 1. CORS
//! 2. Access log: method, path, status and latency of every request

pub mod access_log;
