//! Domain logic for the NPU job monitoring service.
//!
//! Everything in this crate is pure: no database access, no network I/O.
//! The `db` and `api` crates feed rows in and ship results out.

pub mod analysis;
pub mod error;
pub mod filters;
pub mod grouping;
pub mod pagination;
pub mod prompt;
pub mod secrets;
pub mod stats;
pub mod types;
