//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig.bind_address
//!     → listener.rs (parse, bind, log local address)
//!     → Hand off to HTTP layer (axum::serve)
//! ```
//!
//! # Design Decisions
//! - Binding happens before the serve task is spawned, so a bind failure
//!   surfaces to the caller and stops startup

pub mod listener;

pub use listener::{bind, ListenerError};
