//! Shelf Core - Shared catalog types.
//!
//! This crate provides the types shared by the Shelf components:
//! - `bot` - Telegram bot and catalog consistency protocol
//! - `cli` - Command-line access to the same catalog commands
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, category codes, pricing and catalog records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
