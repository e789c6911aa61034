pub mod network_validator;

pub use network_validator::{validate_network, ValidationConfig};
