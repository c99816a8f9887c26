mod builder;
mod command;
pub mod headers;
mod message;
pub mod resource;

pub use builder::RequestBuilder;
pub use command::{Command, HttpMethod, ServiceDomain};
pub use message::{Parameters, RequestMessage};
