/// Main configuration module.
/// 
/// Re-exports submodules for runtime gateway settings and matchmaking limits.
pub mod gateway;
pub mod matchmaking;

pub use gateway::{ConfigError, GatewayConfig};
