//! Test helpers module
//!
//! Fake collaborators, a service context wired to the in-memory store, and
//! test data builders. Not every test binary uses every helper.

#![allow(dead_code)]

pub mod fakes;
pub mod saas_mock;
pub mod test_context;
pub mod test_data;

pub use fakes::*;
pub use saas_mock::*;
pub use test_context::*;
pub use test_data::*;
