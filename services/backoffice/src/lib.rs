//! Brokerage back-office service library crate.
//!
//! # Purpose
//! Exposes the lead pipeline, the notification center, the HTTP surface and
//! the storage backends for use by the binary and integration tests.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod model;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod store;
