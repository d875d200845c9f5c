//! Common test utilities for the harness suites

#![allow(dead_code, unused_imports)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{StaticRunner, TestHelpers};
