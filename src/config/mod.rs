//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, semantic checks)
//!     → Config (validated, immutable)
//!     → values passed explicitly at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - No global config singleton: subsystems receive the values they need

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::Config;
