//! # DSAMate Worker Library
//!
//! Background jobs that run outside the API process.
//!
//! ## Modules
//!
//! - `config`: Environment configuration
//! - `scheduler`: Daily Problem of the Day mailing

pub mod config;
pub mod scheduler;
