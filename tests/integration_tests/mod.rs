//! Integration tests module
//!
//! End-to-end tests for the sitesweep pipeline, including:
//! - Complete resolve → dispatch → merge → render → notify runs
//! - Stage failures and what they leave behind

pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
