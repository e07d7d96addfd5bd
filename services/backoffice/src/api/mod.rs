//! Back-office HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules for the public site, the authenticated
//! back office, and the internal event intake.
pub mod error;
pub mod internal;
pub mod leads;
pub mod notifications;
pub mod openapi;
pub mod public;
pub mod system;
pub mod types;
