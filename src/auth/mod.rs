mod credentials;
mod signer;
pub mod token;

pub use credentials::Credentials;
pub use signer::CommandSigner;
pub use token::KodoAuth;
