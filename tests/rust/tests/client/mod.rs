//! Client tracer integration tests
//!
//! Drives `ClientTracer<reqwest::Client>` against a wiremock server.
