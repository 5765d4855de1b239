//! # DSAMate API Server Library
//!
//! HTTP JSON API behind the DSAMate practice sheet: accounts and sessions,
//! progress and badges, roadmaps, quizzes, community content and the
//! Problem of the Day.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Environment configuration
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Rate limiting and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
