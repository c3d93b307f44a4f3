//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or built-in defaults
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CaptureConfig (validated, immutable)
//!     → sections handed to each component at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    CaptureConfig, ErrorAction, ErrorPolicyConfig, FeedConfig, ListenerConfig,
    ObservabilityConfig, OutputConfig, UnsubscribeRoute, DEFAULT_CATEGORIES,
};
pub use validation::{validate_config, ValidationError};
