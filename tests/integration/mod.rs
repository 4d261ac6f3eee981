//! Integration test suite for geoinv.
//!
//! End-to-end scenarios run the real aggregator and resolver against a
//! scripted in-memory catalog; no network access is involved.

mod cli_smoke;
mod scenarios;
