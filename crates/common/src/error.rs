//! Common error types

use ipheth_driver::DriverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
