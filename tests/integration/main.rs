//! Integration tests for Entity-Harvester
//!
//! These tests run complete harvests against wiremock servers and check
//! what ends up on disk.

mod common;

mod failure_tests;
mod harvest_tests;
mod resume_tests;
