// Library exports for the CLI and integration tests
pub mod auth;
pub mod config;
pub mod exception;
pub mod marker_cache;
pub mod request;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use auth::{CommandSigner, Credentials};
pub use config::{ClientConfiguration, DomainConfig, SigningPolicy};
pub use marker_cache::MarkerCache;
pub use request::{Command, RequestBuilder, RequestMessage};
pub use storage::{InMemoryTransport, ObjectService, RawResponse, Transport, TransportError};
pub use types::{ClientError, ClientResult, ObjectListing, ObjectMetadata, ProviderError};
