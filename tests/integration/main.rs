//! Integration tests for site-audit
//!
//! These tests use wiremock to create mock sites and run full audits
//! end-to-end, from the pre-checks to the scored report.

mod audit_tests;
mod helpers;
mod lease_tests;
