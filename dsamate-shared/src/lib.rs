//! # DSAMate Shared Library
//!
//! Types, persistence and business rules shared by the DSAMate API server
//! and worker.
//!
//! ## Module Organization
//!
//! - `auth`: passwords, OTPs, session tokens, OAuth and the session extractor
//! - `catalog`: bundled question and roadmap data
//! - `db`: connection pool and embedded migrations
//! - `gamification`: streaks, progress updates and badge rules
//! - `leaderboard`: contributor points from GitHub pull requests
//! - `mail`: mailer trait, relay client and message templates
//! - `models`: database models
//! - `potd`: Problem of the Day selection and the daily mailing job

pub mod auth;
pub mod catalog;
pub mod db;
pub mod gamification;
pub mod leaderboard;
pub mod mail;
pub mod models;
pub mod potd;

/// Current version of the DSAMate shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
