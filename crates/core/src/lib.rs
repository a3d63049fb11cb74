//! Domain core for the restore-procedure access gate.
//!
//! This crate holds the pieces shared by every other crate in the
//! workspace:
//!
//! - [`lifecycle`] — the request status state machine (pending, approved,
//!   granted, denied) and its transition rules.
//! - [`validation`] — user name and entry token shape checks.
//! - [`operators`] — the fixed operator code allow-list.
//! - [`error`] — the [`CoreError`](error::CoreError) taxonomy.
//! - [`types`] — shared primitive aliases and id generation.
//!
//! Nothing here performs I/O; everything is a pure function over its
//! inputs and is unit-tested in place.

pub mod error;
pub mod lifecycle;
pub mod operators;
pub mod types;
pub mod validation;
