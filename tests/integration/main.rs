//! Integration tests for the refresh pipeline and the request server
//!
//! Upstream servers are mocked with wiremock; where in-flight requests have to
//! be observed, a small axum server with counters stands in instead.

mod aggregate_tests;
mod common;
