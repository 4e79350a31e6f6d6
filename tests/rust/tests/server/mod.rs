//! Access log middleware integration tests
//!
//! Serves an axum router behind `AccessLogLayer` on a random port and calls
//! it with reqwest.

mod middleware;
