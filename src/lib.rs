//! Notification client - main library
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, logging, runners)
//! - **hyperstream**: Event-stream client library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use notification_client::bin_common::{resolve_config_path, ConfigType};
//! use notification_client::hyperstream::StreamSettings;
//! ```

// Re-export workspace libraries for convenience
pub use hyperstream;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod logging;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, resolve_config_path, ConfigType};
    pub use logging::init_tracing;
    pub use runner::{shutdown_signal, BinaryRunner, RunConfig};
}
