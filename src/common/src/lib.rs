pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;

pub use config::Configuration;
pub use error::{Error, ErrorKind, Result};
