//! Live feed integration subsystem.
//!
//! # Data Flow
//! ```text
//! FeedConfig (api URL, callback URL, categories)
//!     → types.rs (Subscription record, CategoryFilters)
//!     → client.rs (POST/PUT/DELETE against the feed API)
//!     → server-assigned id merged back into the record
//!
//! Feed pushes callbacks
//!     → types.rs (Event decoding)
//!     → http layer hands categories to the output store
//! ```
//!
//! # Constraints
//! - Exactly one subscription per process
//! - Failures are reported, never retried

pub mod client;
pub mod types;

pub use client::SubscriptionClient;
pub use types::{
    CallbackType, CategoryFilters, Event, EventError, Filter, IdentityChainId, Subscription,
    SubscriptionError,
};
