//! Configuration: environment-driven settings and operational constants.

mod constants;
mod types;

pub use constants::*;
pub use types::{
    parse_key_list, Config, Environment, HostHints, LlmConfig, LogFormat, LogLevel,
};
