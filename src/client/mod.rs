//! Connection lifecycle management.
//!
//! This module owns everything between "here is a URL" and "here is a
//! live connection": configuration, the handle slot, backoff and the
//! reconnect state machine.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent, serde-deserializable configuration builder |
//! | `config` | Immutable [`ClientConfig`] and its defaults |
//! | `core` | The [`Client`] itself |
//! | `state` | [`ConnectionState`] and the handle slot |

// ============================================================================
// Submodules
// ============================================================================

mod backoff;

/// Configuration builder.
pub mod builder;

/// Client configuration.
pub mod config;

/// The lifecycle manager.
pub mod core;

/// Connection state tracking.
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use config::ClientConfig;
pub use self::core::Client;
pub use state::ConnectionState;
