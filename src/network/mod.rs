//! Network Module
//!
//! Socket handling on both ends of the wire.
//!
//! ## Architecture
//! - `Transport`: one TCP stream or connected UDP socket to the reader
//! - `Connection`: the transport plus its background receive thread, which
//!   reassembles frames and dispatches them
//! - `MockReader`: a reference reader for tests and local experiments

mod connection;
mod mock;
mod transport;

pub use connection::{Connection, Dispatcher, TagHandler};
pub use mock::{MockReader, MockState, MOCK_READER_ID, MOCK_VERSION};
pub use transport::Transport;
