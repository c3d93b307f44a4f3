//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Ensure output dir → Bind + serve callbacks → Register subscription
//!
//! Shutdown (startup.rs, shutdown.rs):
//!     Signal received → Delete subscription → Stop accepting → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: the feed only learns our URL once we are listening
//! - Ordered shutdown: unsubscribe first so the feed stops pushing

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{configured_subscription, run, start, CaptureError, RunningCapture};
