//! # dbprobe
//!
//! Lazily-initialized database client with backend selection, plus an
//! HTTP health probe.
//!
//! The connection string picks the backend: SQLite for `file:` strings,
//! Postgres (self-hosted or managed behind a pooler) for `postgres://`, and
//! sqlx's generic driver for anything else. One client is cached per
//! process and shared by every caller.

pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod http;
pub mod telemetry;
