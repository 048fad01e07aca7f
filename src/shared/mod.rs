//! Transport plumbing shared by the server.

pub mod stdio;
pub mod transport;

pub use stdio::StdioTransport;
pub use transport::{Transport, TransportMessage};
