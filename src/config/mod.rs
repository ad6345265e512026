//! Resolver configuration and tag class definitions.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{AttrConfig, ResolverConfig, TagClassConfig, TagClassesConfig};
