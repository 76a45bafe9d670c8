//! Core types and trait definitions for fwedbot.
//!
//! This crate is deliberately free of database and chat-transport
//! dependencies. The storage backend and the bot depend on it; it depends on
//! nothing platform-specific.

pub mod action;
pub mod alert;
pub mod detect;
pub mod error;
pub mod model;
pub mod stage;
pub mod store;

pub use error::{Error, Result};
