//! Cross-backend test suites.
//!
//! Per-translator behavior lives next to each translator; these modules
//! cover the properties that must hold across all five targets at once,
//! and the HTTP provider round-trips.

mod divergence_tests;
mod provider_tests;
