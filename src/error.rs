//! Error type shared by the transport, protocol and instrument layers.

use bigdecimal::ParseBigDecimalError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Connect, read or write failure on the underlying socket.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    /// Reply line missing or unreadable.
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("failed to parse decimal from {response:?}: {source}")]
    NumericFormat {
        response: String,
        #[source]
        source: ParseBigDecimalError,
    },
}
