#![forbid(unsafe_code)]

pub mod cli;
pub mod command;
pub mod driver;
pub mod error;

pub use cli::run_from_env;
pub use driver::{Driver, Response};
pub use error::{CliError, Result};
