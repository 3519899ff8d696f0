//! Trade-finance platform facade.
//!
//! Wires the component engines to one shared store, a token bank, a price
//! oracle and a clock. Each public operation is atomic: the store changes
//! and the token movements it implies either all happen or none do.

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod tracing_spans;

pub use config::{GenesisConfig, PlatformConfig, StorageConfig};
pub use error::PlatformError;
pub use logging::{init_logging, LogFormat};
pub use platform::{Engines, Platform};
