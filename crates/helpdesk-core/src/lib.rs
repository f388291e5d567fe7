//! helpdesk-core: ticket and todo stores, the key-value persistence adapter,
//! derived views, and the session context.
//!
//! # Conventions
//!
//! - **Errors**: storage and config failures are `thiserror` enums carrying an
//!   [`error::ErrorCode`]. Domain no-ops (unknown id, no session, empty text)
//!   are plain values, never errors.
//! - **Logging**: `tracing` macros. Every write logs at `debug`; corrupt
//!   payloads log at `error`.
//! - **Time**: every timestamp comes from a [`clock::Clock`] so tests can pin it.

pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod lock;
pub mod model;
pub mod seed;
pub mod session;
pub mod storage;
pub mod store;
pub mod view;
