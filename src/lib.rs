//! Live feed event capture bridge.
//!
//! Registers a subscription with a live event-feed API, receives pushed
//! callbacks over HTTP, and keeps the latest event of each category as
//! `<output directory>/<category>.json`.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                  FEED CAPTURE                    │
//!   Feed API      │  ┌──────────────┐                                │
//!   ◀─────────────┼──│ feed client  │◀── lifecycle (start/shutdown)  │
//!   POST/PUT/DEL  │  └──────────────┘                                │
//!                 │                                                  │
//!   Feed pushes   │  ┌─────────┐    ┌──────────┐    ┌──────────────┐ │
//!   ──────────────┼─▶│   net   │───▶│  http    │───▶│    store     │─┼──▶ <dir>/<CAT>.json
//!   POST /callback│  │listener │    │ callback │    │ per-category │ │
//!                 │  └─────────┘    └──────────┘    └──────────────┘ │
//!                 │                                                  │
//!                 │  config · observability (tracing, metrics)       │
//!                 └──────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod feed;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod store;

pub use config::CaptureConfig;
pub use feed::{Subscription, SubscriptionClient};
pub use http::CallbackServer;
pub use lifecycle::{CaptureError, RunningCapture, Shutdown};
pub use store::{EventSink, OutputStore};
