//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Feed pushes POST /callback
//!     → request.rs (assign request ID)
//!     → server.rs (read body, decode Event)
//!     → one EventSink::write per category, full body each time
//!     → 200 OK regardless of outcome
//! ```

pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{dispatch_event, AppState, CallbackServer, DispatchOutcome, ServerHandle};
