// src/lib.rs

//! News crawler library
//!
//! Runs configured collectors, works out which records are new since the
//! previous run, notifies the configured channels and remembers what was sent.

pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod scheduler;
pub mod services;
pub mod storage;
pub mod utils;
