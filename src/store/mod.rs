//! Output store subsystem.
//!
//! # Data Flow
//! ```text
//! callback body + category name
//!     → format.rs (sorted keys, tab indentation; raw bytes if not JSON)
//!     → output.rs (per-category lock, write `<dir>/<category>.json`)
//! ```

pub mod format;
pub mod output;

pub use format::format_json;
pub use output::{EventSink, OutputStore, StoreError};
