//! Turnstile - Per-Client Admission Controller
//!
//! This crate implements a fixed-window admission controller that decides,
//! per client key, whether a request is admitted or rejected for exceeding
//! its quota. An axum host service puts the controller in front of HTTP
//! routes and exposes an admin surface for inspection and resets.

pub mod admission;
pub mod config;
pub mod error;
pub mod http;
