//! Core types and utilities shared by the sessionbridge crates.
//!
//! This crate provides the foundational pieces used throughout the session
//! validation pipeline: the `UserId` newtype for framework user keys and the
//! log-sanitization switch that decides whether secrets may appear
//! unredacted in diagnostics.

pub mod id;
pub mod security;

pub use id::{ParseIdError, UserId};
