//! vaxishare server library.
//!
//! This crate primarily ships the `vaxishare-server` binary, but we expose a
//! small library surface to enable integration testing and reuse.

pub mod api;
pub mod config;
pub mod seed;
pub mod state;
pub mod worker;
