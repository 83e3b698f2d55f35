//! Pong server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod config;
pub mod hub;
pub mod room;
pub mod session;
pub mod tick;
pub mod ws;
