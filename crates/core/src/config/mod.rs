//! Run configuration: types and eager validation.

mod types;
mod validate;

pub use types::{parse_header, ConfigError, HttpMethod, RunConfig};
pub use validate::validate_config;
