//! Lunaria Core - Shared types library.
//!
//! This crate provides common types used across all Lunaria components:
//! - `api` - Remote catalog/order and payment-gateway clients
//! - `session` - Reactive commerce stores and checkout orchestration
//! - `cli` - Command-line tools for inspecting a session
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
