//! Integration tests for the crawl-to-index pipeline
//!
//! These tests use wiremock to create mock HTTP servers (one per domain) and
//! run full crawl cycles against a temporary database and an in-memory
//! vector store.

mod common;
mod crawl_tests;
mod index_tests;
