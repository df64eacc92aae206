//! # dizmen
//!
//! Server and command line front ends for the Dizmen menu platform.
//!
//! - `api`: axum router, JWT authentication, rate limiting
//! - `cli`: clap commands for operators
//! - `config`: `dizmen.toml` with `DIZMEN_*` environment overrides

pub mod api;
pub mod cli;
pub mod config;
