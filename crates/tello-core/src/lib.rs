//! Renewal decision engine and state cache for the Tello auto-renewal system.
//!
//! This crate decides, on each scheduled invocation, whether a real renewal
//! attempt against the external account is needed, skips it when safe, and
//! durably remembers the outcome of the last attempt so that repeated
//! invocations are idempotent and crash-mid-write cannot corrupt state.
//!
//! The browser-automation client that performs the actual renewal and the
//! notification subsystem are external collaborators; they appear here only
//! as the [`runner::RenewalClient`] trait boundary.

pub mod clock;
pub mod config;
pub mod engine;
pub mod runner;
pub mod state;
