//! # introspec (application library)
//!
//! The CLI surface and the wired demo domain, split out of the binary so
//! integration tests can drive the same code paths the executable does.

pub mod cli;
pub mod demo;
