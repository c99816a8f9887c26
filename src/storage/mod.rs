mod backend;
mod in_memory;
mod service;

pub use backend::{RawResponse, Transport, TransportError};
pub use in_memory::InMemoryTransport;
pub use service::ObjectService;
