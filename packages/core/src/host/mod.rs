//! Host management module
//!
//! Provides functionality for registering target hosts:
//! - Host string parsing (protocol, credentials, port, query variables)
//! - The ordered host registry and its plain and tabular file loaders
//! - Interactive placeholder resolution

mod error;
mod prompt;
mod registry;
mod url;

// Public exports
pub use error::HostError;
pub use prompt::{CredentialResolver, NoPrompt, PlaceholderRequest};
pub use registry::{DEFAULT_PROTOCOL, HostEntry, HostRegistry};
pub use url::HostUrl;
