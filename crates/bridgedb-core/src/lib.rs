pub mod config;
pub mod transports;
pub mod types;

pub use config::{BridgeDbConfig, ConfigError};
pub use transports::{KNOWN_TRANSPORTS, SupportedTransports, TransportRegistry, VANILLA, is_known_transport};
pub use types::*;
