//! Observability utilities for remote tools.
//!
//! [`tracing_support`] wires a subscriber for hosts and tests, and [`health`]
//! carries the best-effort health-report contract used after every describe and
//! execute call.

#![warn(missing_docs, clippy::pedantic)]

pub mod health;
pub mod tracing_support;
