//! # pulse-core
//!
//! Core types, errors, and logging for PulseAPI.
//!
//! This crate provides:
//! - [`PulseError`] - Configuration, I/O, and setup errors
//! - [`logging`] - Tracing setup
//! - [`types`] - Identity and status types shared by every crate
//!
//! ## Example
//!
//! ```no_run
//! use pulse_core::{Identity, logging, types::DEFAULT_DEMO_EMAIL};
//!
//! fn main() -> pulse_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!
//!     let identity = Identity::classify("u-1", "demo@pulseapi.com", DEFAULT_DEMO_EMAIL);
//!     assert!(identity.is_demo());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

pub use error::{PulseError, Result};
pub use logging::{LogGuard, init_logging};
pub use types::{DataSource, Identity, IdentityKind, ProviderStatus, Severity, TrendDirection};
