//! Core types, wire protocol, config, and errors for Chalkline.

pub mod config;
pub mod error;
pub mod protocol;
pub mod types;
