//! Camstation - webcam surveillance station
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod recording;
pub mod server;
