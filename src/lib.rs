pub mod error;
pub mod instrument;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod mock_connection;

// Re-export the primary types so users can depend on the crate
// without knowing the internal module layout.
pub use error::{Error, Result};
pub use instrument::*;
pub use protocol::{Connection, ScpiProtocol};
pub use transport::{DEFAULT_PORT, StreamTransport, TcpTransport, Transport};
