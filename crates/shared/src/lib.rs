//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common pieces used across all other crates:
//! - Configuration management
//! - JWT claims and token validation

pub mod auth;
pub mod config;
pub mod jwt;

pub use auth::Claims;
pub use config::AppConfig;
pub use jwt::{JwtConfig, JwtError, JwtService};
