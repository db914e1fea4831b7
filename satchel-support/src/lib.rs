//! # Satchel Support
//!
//! Shared utilities for the Satchel IoC container.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - "Did you mean?" suggestions for misspelled keys
pub mod rendering;
