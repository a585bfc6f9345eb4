//! Async JSON-over-TCP transport used to reach the remote server.

mod error;

pub mod codec;
pub mod connection;
pub mod framing;

pub use connection::Connection;
pub use error::WireError;
