//! Tokengate - Access-Token Validation Gateway
//!
//! This crate implements the authentication front of an HTTP gateway. Every
//! request presents a bearer token; a process-wide cache resolves each token
//! once against the token store and then enforces token expiry and a
//! per-token sliding-window rate limit on every hit.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod limiter;
pub mod store;
