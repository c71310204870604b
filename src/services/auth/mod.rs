pub mod context;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod request;
pub mod revocation;
pub mod token_codec;

pub use context::{Principal, SecurityContext};
pub use credentials::{CredentialAuthenticator, IssuedToken};
pub use error::{AuthError, TokenError};
pub use request::{AuthOutcome, BearerCredential, RequestAuthenticator};
pub use revocation::RevocationRegistry;
pub use token_codec::{Claims, TokenCodec};
