//! Tollgate - Per-Client HTTP Rate Limiting
//!
//! This crate implements an HTTP admission layer that limits how many requests
//! each client may issue per unit time. Every client source address gets its
//! own token bucket, held in an in-memory registry that a background task
//! sweeps to forget clients that have gone quiet.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
