//! Common test utilities and infrastructure
//!
//! A scripted stand-in for the docker tooling plus fixtures shared by the
//! controller test suites.

#![allow(dead_code, unused_imports)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{ScriptedRunner, TestHelpers};
