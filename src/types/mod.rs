pub mod error;
mod models;
pub mod wire;

pub use error::{ClientError, ClientErrorCode, ClientResult, ProviderError};
pub use models::{
    BlockContext, ListObjectsRequest, ObjectListing, ObjectMetadata, ObjectSummary,
    PutObjectResult,
};
pub use wire::{KodoObjectListing, KodoObjectMetadata, WireStatus, normalize_marker};
