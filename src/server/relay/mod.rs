//! Traffic of committed matches: the backend link and the identity-tagging multiplexer.

pub mod backend;
pub mod multiplexer;

pub use backend::{BackendConnector, BackendLink, TcpBackend};
pub use multiplexer::Multiplexer;
